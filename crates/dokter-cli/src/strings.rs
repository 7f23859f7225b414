//! User-facing text

use dokter_chat::{Error, ErrorKind};

pub const TITLE: &str = "🤖 Chatbot Medis Berbasis Gemini";
pub const CAPTION: &str =
    "Tuliskan penyakit yang perlu di diagnosis. Tolak pertanyaan selain tentang penyakit.";
pub const PLACEHOLDER: &str = "Masukkan gejala penyakit...";
pub const THINKING: &str = "Dokter sedang berpikir...";
pub const CANCELLED: &str = "Permintaan dibatalkan.";
pub const CANCELLING: &str = "Membatalkan...";
pub const READY: &str = "Siap";
pub const KEY_HINTS: &str = "Enter: kirim │ Esc: batal │ Ctrl+C: keluar";

pub const MISSING_API_KEY: &str =
    "API Key Gemini tidak ditemukan. Harap tambahkan 'gemini_api_key' di file secrets.toml Anda.";

/// Message for a secrets file that exists but cannot be used
pub fn config_error(error: &impl std::fmt::Display) -> String {
    format!("Kesalahan konfigurasi API Key: {}", error)
}

/// Message for an error that stops the program before the chat opens
pub fn startup_error(error: &Error) -> String {
    match (error, error.kind()) {
        (Error::MissingApiKey, _) => MISSING_API_KEY.to_string(),
        (_, ErrorKind::Configuration) => config_error(error),
        (_, ErrorKind::ModelInit) => format!("Kesalahan saat inisialisasi model: {}", error),
        (_, ErrorKind::Relay) => relay_error(error),
    }
}

/// Inline message for one failed prompt
pub fn relay_error(error: &impl std::fmt::Display) -> String {
    format!("Terjadi kesalahan: {}", error)
}
