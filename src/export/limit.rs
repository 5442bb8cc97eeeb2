use std::fmt::Display;
use std::str::FromStr;

/// A failure to parse a partition limit or file size.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a message count or file size")]
pub struct LimitError(String);

/// A byte quantity with decimal (1000-based) magnitudes.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileSize(u64);

impl FileSize {
    /// Creates a size from a raw byte count.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Returns the total number of bytes.
    #[inline]
    #[must_use]
    pub const fn total_bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for FileSize {
    type Err = LimitError;

    /// Parses strings like `1000`, `500kb`, `10mb`, or `1.5gb`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let split = trimmed
            .find(|character: char| !character.is_ascii_digit() && character != '.')
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let number: f64 = number.parse().map_err(|_| LimitError(value.to_owned()))?;

        let magnitude: u64 = match unit.to_ascii_lowercase().as_str() {
            "" | "b" => 1,
            "kb" => 1_000,
            "mb" => 1_000_000,
            "gb" => 1_000_000_000,
            _ => return Err(LimitError(value.to_owned())),
        };

        if !number.is_finite() || number < 0.0 {
            return Err(LimitError(value.to_owned()));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let bytes = (number * magnitude as f64).round() as u64;

        Ok(Self(bytes))
    }
}

impl Display for FileSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[allow(clippy::cast_precision_loss)]
        let bytes = self.0 as f64;

        match self.0 {
            0..=999 => write!(f, "{} B", self.0),
            1_000..=999_999 => write!(f, "{:.1} KB", bytes / 1_000.0),
            1_000_000..=999_999_999 => write!(f, "{:.1} MB", bytes / 1_000_000.0),
            _ => write!(f, "{:.1} GB", bytes / 1_000_000_000.0),
        }
    }
}

/// When the sink rolls the current output file over into a new partition.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum PartitionLimit {
    /// Never roll over.
    #[default]
    Null,
    /// Roll over after this many messages.
    MessageCount(u64),
    /// Roll over once this many bytes are written.
    ByteSize(FileSize),
}

impl PartitionLimit {
    /// Returns whether the current partition is full.
    ///
    /// A partition may exceed a byte limit by at most the one message that
    /// crossed it; the check runs before each write, never mid-message.
    #[must_use]
    pub fn is_reached(self, messages_written: u64, bytes_written: u64) -> bool {
        match self {
            Self::Null => false,
            Self::MessageCount(count) => messages_written >= count,
            Self::ByteSize(size) => bytes_written >= size.total_bytes(),
        }
    }
}

impl FromStr for PartitionLimit {
    type Err = LimitError;

    /// Parses a bare integer as a message count and anything else as a file
    /// size.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(count) = value.trim().parse::<u64>() {
            return Ok(Self::MessageCount(count));
        }

        value.parse::<FileSize>().map(Self::ByteSize)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn file_size_parses_decimal_magnitudes() {
        assert_eq!("10mb".parse::<FileSize>().unwrap().total_bytes(), 10_000_000);
        assert_eq!("1.5mb".parse::<FileSize>().unwrap().total_bytes(), 1_500_000);
        assert_eq!("500KB".parse::<FileSize>().unwrap().total_bytes(), 500_000);
        assert_eq!("1gb".parse::<FileSize>().unwrap().total_bytes(), 1_000_000_000);
        assert_eq!("42".parse::<FileSize>().unwrap().total_bytes(), 42);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert!("invalid".parse::<FileSize>().is_err());
        assert!("10tb".parse::<FileSize>().is_err());
        assert!("".parse::<FileSize>().is_err());
        assert!("-5mb".parse::<FileSize>().is_err());
    }

    #[test]
    fn partition_limit_prefers_message_counts() {
        assert_eq!("1000".parse::<PartitionLimit>().unwrap(), PartitionLimit::MessageCount(1_000));
        assert_eq!(
            "10mb".parse::<PartitionLimit>().unwrap(),
            PartitionLimit::ByteSize(FileSize::from_bytes(10_000_000))
        );
    }

    #[test]
    fn reached_checks_per_variant() {
        assert!(!PartitionLimit::Null.is_reached(u64::MAX, u64::MAX));
        assert!(PartitionLimit::MessageCount(3).is_reached(3, 0));
        assert!(!PartitionLimit::MessageCount(3).is_reached(2, 0));
        assert!(PartitionLimit::ByteSize(FileSize::from_bytes(10)).is_reached(0, 10));
    }

    #[test]
    fn display_uses_the_largest_unit() {
        assert_eq!(FileSize::from_bytes(1_500_000).to_string(), "1.5 MB");
        assert_eq!(FileSize::from_bytes(950).to_string(), "950 B");
    }
}
