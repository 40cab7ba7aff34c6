use crate::error::OverlayError;
use crate::overlay::split::collapse_whitespace;

/// Word-count ceiling for the exhaustive partition search. Above this the
/// packer switches to greedy chunking: the enumeration is exponential in the
/// number of words and only meant for short captions.
pub const MAX_EXHAUSTIVE_WORDS: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceOptions {
    pub target_words_per_line: usize,
    pub min_words_per_line: usize,
    pub max_words_per_line: usize,
    /// Character-length variance across lines considered "balanced enough"
    /// to earn the flat bonus.
    pub max_char_variance: f32,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        Self {
            target_words_per_line: 4,
            min_words_per_line: 2,
            max_words_per_line: 5,
            max_char_variance: 36.0,
        }
    }
}

impl BalanceOptions {
    fn validate(&self) -> Result<(), OverlayError> {
        if self.min_words_per_line == 0 {
            return Err(OverlayError::InvalidConfig(
                "min words per line must be at least 1".to_string(),
            ));
        }
        if self.min_words_per_line > self.max_words_per_line {
            return Err(OverlayError::InvalidConfig(format!(
                "min words per line ({}) exceeds max ({})",
                self.min_words_per_line, self.max_words_per_line
            )));
        }
        if self.max_char_variance < 0.0 {
            return Err(OverlayError::InvalidConfig(
                "max char variance must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pack caption words into lines of near-equal word count and character
/// length. Short captions short-circuit to a single line; captions beyond
/// [`MAX_EXHAUSTIVE_WORDS`] fall back to greedy chunking at the target size.
pub fn balance_lines(
    caption: &str,
    options: &BalanceOptions,
) -> Result<Vec<String>, OverlayError> {
    options.validate()?;
    let collapsed = collapse_whitespace(caption);
    let words: Vec<&str> = collapsed.split_whitespace().collect();
    if words.is_empty() {
        return Err(OverlayError::EmptyCaption);
    }
    if words.len() <= options.max_words_per_line {
        return Ok(vec![words.join(" ")]);
    }
    if words.len() > MAX_EXHAUSTIVE_WORDS {
        return Ok(greedy_chunks(&words, options));
    }

    let mut best: Option<(f32, Vec<usize>)> = None;
    let mut sizes = Vec::new();
    enumerate_partitions(words.len(), options, &mut sizes, &mut |candidate| {
        let score = score_partition(&words, candidate, options);
        let better = match &best {
            Some((best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((score, candidate.to_vec()));
        }
    });

    // Some word counts cannot be composed of group sizes in [min, max]
    // (e.g. 7 words with min = max = 5); greedy chunking covers those.
    match best {
        Some((_, sizes)) => Ok(materialize(&words, &sizes)),
        None => Ok(greedy_chunks(&words, options)),
    }
}

fn enumerate_partitions(
    remaining: usize,
    options: &BalanceOptions,
    sizes: &mut Vec<usize>,
    emit: &mut impl FnMut(&[usize]),
) {
    if remaining == 0 {
        emit(sizes);
        return;
    }
    let upper = options.max_words_per_line.min(remaining);
    for size in options.min_words_per_line..=upper {
        sizes.push(size);
        enumerate_partitions(remaining - size, options, sizes, emit);
        sizes.pop();
    }
}

fn score_partition(words: &[&str], sizes: &[usize], options: &BalanceOptions) -> f32 {
    let lines = materialize(words, sizes);
    let char_lengths: Vec<f32> = lines
        .iter()
        .map(|line| line.chars().count() as f32)
        .collect();
    let mean = char_lengths.iter().sum::<f32>() / char_lengths.len() as f32;
    let variance = char_lengths
        .iter()
        .map(|len| (len - mean) * (len - mean))
        .sum::<f32>()
        / char_lengths.len() as f32;

    let mut score = -variance / options.max_char_variance.max(1.0);
    if variance <= options.max_char_variance {
        score += 1.0;
    }

    let average_words = words.len() as f32 / sizes.len() as f32;
    score -= (average_words - options.target_words_per_line as f32).abs();

    score += sizes.iter().filter(|size| (3..=4).contains(*size)).count() as f32 * 0.5;

    if sizes.len() > 3 {
        score -= (sizes.len() - 3) as f32 * 2.0;
    }
    score
}

fn materialize(words: &[&str], sizes: &[usize]) -> Vec<String> {
    let mut lines = Vec::with_capacity(sizes.len());
    let mut cursor = 0;
    for &size in sizes {
        lines.push(words[cursor..cursor + size].join(" "));
        cursor += size;
    }
    lines
}

fn greedy_chunks(words: &[&str], options: &BalanceOptions) -> Vec<String> {
    let mut lines: Vec<String> = words
        .chunks(options.target_words_per_line.max(1))
        .map(|chunk| chunk.join(" "))
        .collect();
    // A trailing chunk below the minimum folds into the previous line.
    if lines.len() > 1
        && lines[lines.len() - 1].split_whitespace().count() < options.min_words_per_line
    {
        if let Some(last) = lines.pop() {
            if let Some(previous) = lines.last_mut() {
                previous.push(' ');
                previous.push_str(&last);
            }
        }
    }
    lines
}
