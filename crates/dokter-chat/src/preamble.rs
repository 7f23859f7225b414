//! The scripted opening exchange that primes the model.

use crate::conversation::Turn;

/// Instruction sent as the first user turn
pub const INSTRUCTION: &str = "Saya adalah seorang tenaga medis. Tuliskan penyakit yang perlu di diagnosis. Jawaban singkat dan jelas. Tolak pertanyaan selain tentang penyakit";

/// The model's scripted acknowledgment
pub const ACKNOWLEDGMENT: &str = "Baik! Tuliskan penyakit yang perlu di diagnosis.";

/// Number of turns the preamble occupies at the head of every history
pub const LEN: usize = 2;

/// Build the two preamble turns
pub fn turns() -> Vec<Turn> {
    vec![Turn::user(INSTRUCTION), Turn::model(ACKNOWLEDGMENT)]
}
