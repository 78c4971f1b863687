use rig::embeddings::Embedding;

/// Conversion between `rig` embeddings and the little-endian `f32` blobs
/// stored in `F32_BLOB` columns
pub trait EmbeddingConversion: Sized {
    fn to_f32_vec(&self) -> Vec<f32>;
    fn from_f32_vec(vec: Vec<f32>) -> Self;
    fn to_binary(&self) -> Vec<u8>;
    /// `None` when the blob length is not a multiple of four bytes
    fn from_binary(binary: &[u8]) -> Option<Self>;
}

impl EmbeddingConversion for Embedding {
    fn to_f32_vec(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn from_f32_vec(vec: Vec<f32>) -> Self {
        Self {
            vec: vec.into_iter().map(f64::from).collect(),
            document: String::new(),
        }
    }

    fn to_binary(&self) -> Vec<u8> {
        self.vec
            .iter()
            .flat_map(|f| (*f as f32).to_le_bytes())
            .collect()
    }

    fn from_binary(binary: &[u8]) -> Option<Self> {
        if binary.len() % 4 != 0 {
            return None;
        }
        let vec = binary
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(Self::from_f32_vec(vec))
    }
}
