//! Human readable identifiers.
//!
//! Bills runs, payments and tickets carry a short identifier next to their UUID, such as
//! `BIL-007` or `TKT-042`. Each kind has its own counter, advanced atomically by the store.

use std::fmt;

/// The families of human readable identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Bulk billing transactions
    Bill,
    /// Single payments and manually added payment legs
    Payment,
    /// Service request tickets
    Ticket,
}

impl SequenceKind {
    pub const ALL: [SequenceKind; 3] = [SequenceKind::Bill, SequenceKind::Payment, SequenceKind::Ticket];

    /// The prefix, which is also the counter's key in `sequence_counters`
    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceKind::Bill => "BIL-",
            SequenceKind::Payment => "PYM-",
            SequenceKind::Ticket => "TKT-",
        }
    }

    /// Render a counter value, zero padded to at least three digits.
    pub fn format(&self, value: i64) -> String {
        format!("{}{:03}", self.prefix(), value)
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches('-'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(SequenceKind::Bill.format(1), "BIL-001");
        assert_eq!(SequenceKind::Payment.format(42), "PYM-042");
        assert_eq!(SequenceKind::Ticket.format(999), "TKT-999");
        assert_eq!(SequenceKind::Ticket.format(1000), "TKT-1000");
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = SequenceKind::ALL.iter().map(|k| k.prefix()).collect();
        prefixes.dedup();
        assert_eq!(prefixes.len(), 3);
        assert_eq!(SequenceKind::Bill.to_string(), "BIL");
    }
}
