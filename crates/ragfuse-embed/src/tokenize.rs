use anyhow::{anyhow, ensure, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// XLM-R pad token id.
pub const PAD_ID: u32 = 1;

/// Token ids and attention mask for `text`, cut or padded to exactly `max_len`.
///
/// Padding uses `PAD_ID` with a zero mask so pooling ignores it.
pub fn encode_padded(tokenizer: &Tokenizer, text: &str, max_len: usize) -> Result<(Vec<u32>, Vec<u32>)> {
    ensure!(max_len > 0, "max_len must be positive");
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {e}"))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.resize(max_len, PAD_ID);
    mask.resize(max_len, 0);
    Ok((ids, mask))
}

/// Query text as `[1, max_len]` id and mask tensors on `device`.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let (ids, mask) = encode_padded(tokenizer, text, max_len)?;
    let input_ids = Tensor::from_vec(ids, (1, max_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (1, max_len), device)?;
    Ok((input_ids, attention_mask))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    /// Word-level vocabulary split on whitespace, no model files needed.
    fn word_tokenizer() -> Tokenizer {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"<unk>": 3, "stop": 10, "loss": 11, "rules": 12},
                "unk_token": "<unk>"
            }
        }"#;
        Tokenizer::from_str(json).expect("tokenizer json")
    }

    #[test]
    fn short_queries_are_padded_with_masked_pad_ids() {
        let (ids, mask) = encode_padded(&word_tokenizer(), "stop loss", 5).expect("encode");
        assert_eq!(ids, vec![10, 11, PAD_ID, PAD_ID, PAD_ID]);
        assert_eq!(mask, vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn long_queries_are_cut_and_unknown_words_map_to_unk() {
        let (ids, mask) = encode_padded(&word_tokenizer(), "stop kelly loss rules", 3).expect("encode");
        assert_eq!(ids, vec![10, 3, 11]);
        assert_eq!(mask, vec![1, 1, 1]);
    }

    #[test]
    fn tensors_have_one_row_of_max_len() {
        let (ids, mask) = tokenize_on_device(&word_tokenizer(), "rules", 4, &Device::Cpu).expect("tensors");
        assert_eq!(ids.dims(), [1, 4]);
        assert_eq!(mask.dims(), [1, 4]);
        assert!(encode_padded(&word_tokenizer(), "rules", 0).is_err());
    }
}
