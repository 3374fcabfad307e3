use serde::{Deserialize, Serialize};

/// Informational markers raised while structuring or canonicalizing a
/// document. None of them block acceptance on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// A date failed the grammar and was coerced.
    WeakDates,
    /// Repeated skills, bullets, links or certs were collapsed.
    DuplicatesRemoved,
    /// The heuristic pass did not produce an acceptable document; an external
    /// structuring pass should be attempted.
    HeuristicsIncomplete,
    /// At least one work or education block was discarded by the
    /// completeness gate.
    IncompleteItemsDropped,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::WeakDates => "weak_dates",
            Flag::DuplicatesRemoved => "duplicates_removed",
            Flag::HeuristicsIncomplete => "heuristics_incomplete",
            Flag::IncompleteItemsDropped => "incomplete_items_dropped",
        }
    }
}

/// Pushes `flag` unless it was already raised, keeping first-raised order.
pub fn raise(flags: &mut Vec<Flag>, flag: Flag) {
    if !flags.contains(&flag) {
        flags.push(flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_deduplicates() {
        let mut flags = Vec::new();
        raise(&mut flags, Flag::WeakDates);
        raise(&mut flags, Flag::DuplicatesRemoved);
        raise(&mut flags, Flag::WeakDates);
        assert_eq!(flags, vec![Flag::WeakDates, Flag::DuplicatesRemoved]);
    }

    #[test]
    fn test_wire_names_match_as_str() {
        for flag in [
            Flag::WeakDates,
            Flag::DuplicatesRemoved,
            Flag::HeuristicsIncomplete,
            Flag::IncompleteItemsDropped,
        ] {
            let wire = serde_json::to_value(flag).unwrap();
            assert_eq!(wire, serde_json::Value::String(flag.as_str().to_string()));
        }
    }
}
