//! CTC decoding for text recognition outputs.

use ndarray::ArrayView2;

/// Greedy CTC decoder over a character label map.
///
/// Index 0 is the CTC blank; the label map occupies indices `1..=N`, and a
/// space character is appended after the map, matching how the recognizer
/// models are exported.
#[derive(Debug, Clone)]
pub struct CtcLabelDecode {
    characters: Vec<String>,
}

impl CtcLabelDecode {
    /// Creates a decoder from the lines of a label map file.
    pub fn new(dict_lines: &[String], use_space_char: bool) -> Self {
        let mut characters = Vec::with_capacity(dict_lines.len() + 2);
        characters.push(String::new()); // blank
        characters.extend(dict_lines.iter().cloned());
        if use_space_char {
            characters.push(" ".to_string());
        }
        Self { characters }
    }

    /// Number of classes the decoder expects, including the blank.
    pub fn num_classes(&self) -> usize {
        self.characters.len()
    }

    /// Decodes one sequence of per-timestep class probabilities into a
    /// string and a mean confidence.
    ///
    /// Adjacent repeats collapse into one emission and blanks separate
    /// repeated characters, per the CTC rule.
    pub fn decode(&self, probs: &ArrayView2<f32>) -> (String, f32) {
        let mut text = String::new();
        let mut score_sum = 0.0;
        let mut count = 0usize;
        let mut prev_idx = usize::MAX;

        for t in 0..probs.shape()[0] {
            let row = probs.row(t);
            let (idx, prob) = row
                .iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |acc, (i, &p)| {
                    if p > acc.1 {
                        (i, p)
                    } else {
                        acc
                    }
                });

            if idx != 0 && idx != prev_idx {
                if let Some(character) = self.characters.get(idx) {
                    text.push_str(character);
                    score_sum += prob;
                    count += 1;
                }
            }
            prev_idx = idx;
        }

        let score = if count > 0 {
            score_sum / count as f32
        } else {
            0.0
        };
        (text, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn decoder() -> CtcLabelDecode {
        let dict = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        CtcLabelDecode::new(&dict, true)
    }

    fn one_hot(indices: &[usize], num_classes: usize) -> Array2<f32> {
        let mut probs = Array2::zeros((indices.len(), num_classes));
        for (t, &idx) in indices.iter().enumerate() {
            probs[[t, idx]] = 1.0;
        }
        probs
    }

    #[test]
    fn test_num_classes_counts_blank_and_space() {
        assert_eq!(decoder().num_classes(), 5);
    }

    #[test]
    fn test_collapses_adjacent_repeats() {
        let dec = decoder();
        let probs = one_hot(&[1, 1, 2, 2, 2, 3], 5);
        let (text, score) = dec.decode(&probs.view());
        assert_eq!(text, "abc");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_blank_separates_repeats() {
        let dec = decoder();
        let probs = one_hot(&[1, 0, 1], 5);
        let (text, _) = dec.decode(&probs.view());
        assert_eq!(text, "aa");
    }

    #[test]
    fn test_all_blanks_decode_empty() {
        let dec = decoder();
        let probs = one_hot(&[0, 0, 0], 5);
        let (text, score) = dec.decode(&probs.view());
        assert!(text.is_empty());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_space_char_is_last_class() {
        let dec = decoder();
        let probs = one_hot(&[1, 4, 2], 5);
        let (text, _) = dec.decode(&probs.view());
        assert_eq!(text, "a b");
    }
}
