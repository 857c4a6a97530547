//! Default values shared between CLI parsing and validation.

pub const DEFAULT_FRAME_SAMPLES: usize = 4096;
pub const DEFAULT_AUDIO_CHANNEL_CAPACITY: usize = 32;
pub const DEFAULT_DETECT_INTERVAL_MS: u64 = 100;
pub const DEFAULT_SPEECH_LOCALE: &str = "en-US";
pub const DEFAULT_RESTART_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_RESTARTS_PER_MIN: u32 = 10;
pub const DEFAULT_LINK_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_LINK_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_CAMERA_WIDTH: u32 = 1280;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 720;

pub(super) const MIN_FRAME_SAMPLES: usize = 256;
pub(super) const MAX_FRAME_SAMPLES: usize = 65_536;
pub(super) const MIN_DETECT_INTERVAL_MS: u64 = 16;
pub(super) const MAX_DETECT_INTERVAL_MS: u64 = 10_000;
pub(super) const MIN_RESTART_BACKOFF_MS: u64 = 100;
pub(super) const MAX_RESTART_BACKOFF_MS: u64 = 60_000;

/// ISO-639-1 language codes accepted as the leading segment of
/// `--speech-locale`.
pub(super) const ISO_639_1_CODES: &[&str] = &[
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy",
    "da", "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi", "fj",
    "fo", "fr", "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr", "ht",
    "hu", "hy", "hz", "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv",
    "ka", "kg", "ki", "kj", "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw", "ky",
    "la", "lb", "lg", "li", "ln", "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml", "mn",
    "mr", "ms", "mt", "my", "na", "nb", "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv", "ny",
    "oc", "oj", "om", "or", "os", "pa", "pi", "pl", "ps", "pt", "qu", "rm", "rn", "ro", "ru",
    "rw", "sa", "sc", "sd", "se", "sg", "si", "sk", "sl", "sm", "sn", "so", "sq", "sr", "ss",
    "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti", "tk", "tl", "tn", "to", "tr", "ts",
    "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo", "wa", "wo", "xh", "yi", "yo",
    "za", "zh", "zu",
];
