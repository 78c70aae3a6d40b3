pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const BITS_PER_HEX_DIGIT: u32 = 4;

/// Leading zero hex digits required when no difficulty is configured.
pub const DEFAULT_DIFFICULTY: u32 = 3;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;

/// Nonce attempts between two polls of a mining cancel token.
pub const CANCEL_CHECK_INTERVAL: u64 = 1 << 12;
pub const PROGRESS_LOG_INTERVAL: u64 = 100_000;
