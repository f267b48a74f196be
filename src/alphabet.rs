//! Alphabet and encoding policy.
//!
//! Every edge in the graph is labeled with a `u32` unit. What a unit
//! *means* depends on the encoding mode:
//!
//! - **Ascii**: the unit is the code point itself (0..=127), one byte in
//!   the container.
//! - **Compressed-7**: up to 89 distinct code points; ASCII characters
//!   pass through as their own byte, non-ASCII characters are remapped
//!   onto free printable bytes. One byte per unit in the container.
//! - **Wide**: the unit is the full code point, four bytes in the
//!   container.
//!
//! The alphabet owns the bidirectional char ↔ unit tables and the
//! decision function that picks the smallest mode that fits a working
//! set. The automaton consults it once per walk step; an inadmissible
//! character is a miss for queries and an upgrade trigger for `add`.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::error::{DawgError, Result};

/// The 89 printable bytes eligible to represent remapped non-ASCII code
/// points in Compressed-7 mode, in slot-assignment order.
pub const REMAP_SLOTS: [u8; 89] = [
    b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o',
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', b'A', b'B', b'C', b'D',
    b'E', b'F', b'G', b'H', b'I', b'J', b'K', b'L', b'M', b'N', b'O', b'P', b'Q', b'R', b'S',
    b'T', b'U', b'V', b'W', b'X', b'Y', b'Z', b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7',
    b'8', b'9', b'!', b'#', b'$', b'%', b'&', b'(', b')', b'*', b'+', b',', b'-', b'.', b':',
    b';', b'<', b'=', b'>', b'?', b'@', b'[', b']', b'^', b'_', b'{', b'|', b'}', b'~',
];

/// Maximum number of distinct key code points Compressed-7 can carry.
pub const COMPRESSED_LIMIT: usize = REMAP_SLOTS.len();

/// Unit representation chosen for the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// Code points 0..=127, one byte per unit.
    Ascii,
    /// At most 89 distinct code points remapped into single bytes.
    Compressed,
    /// Full code points, four bytes per unit.
    Wide,
}

impl EncodingMode {
    /// Whether container edge records use the narrow (1-byte unit) form.
    pub fn is_narrow(self) -> bool {
        !matches!(self, EncodingMode::Wide)
    }
}

/// Requested encoding for [`rebuild`](crate::Dawg::rebuild).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingChoice {
    /// Pick the smallest mode that fits the data.
    #[default]
    Auto,
    /// Force ASCII; fails if any character is outside 0..=127.
    Ascii,
    /// Force Compressed-7; fails if the data cannot fit.
    Compressed,
    /// Force wide units.
    Wide,
}

/// Bidirectional character ↔ unit mapping for one encoding mode.
///
/// Tracks the distinct characters seen in keys and in string values
/// separately: the key set drives the mode decision, while both sets
/// veto remap-slot candidacy.
#[derive(Debug, Clone)]
pub struct Alphabet {
    mode: EncodingMode,
    // Compressed-7 only: admitted char -> single-byte unit.
    forward: FxHashMap<char, u32>,
    // Compressed-7 only: byte unit -> admitted char.
    reverse: Vec<Option<char>>,
    key_chars: BTreeSet<char>,
    value_chars: BTreeSet<char>,
}

impl Alphabet {
    /// Fresh alphabet in the given mode with no admitted characters.
    pub fn new(mode: EncodingMode) -> Self {
        let reverse = match mode {
            EncodingMode::Compressed => vec![None; 256],
            _ => Vec::new(),
        };
        Alphabet {
            mode,
            forward: FxHashMap::default(),
            reverse,
            key_chars: BTreeSet::new(),
            value_chars: BTreeSet::new(),
        }
    }

    /// Current encoding mode.
    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// True when the graph carries only 0..=127 units.
    pub fn is_ascii(&self) -> bool {
        self.mode == EncodingMode::Ascii
    }

    /// True when non-ASCII code points are remapped into single bytes.
    pub fn is_compressed(&self) -> bool {
        self.mode == EncodingMode::Compressed
    }

    /// Number of non-identity entries in the forward table.
    pub fn mapped_units(&self) -> usize {
        self.forward
            .iter()
            .filter(|(ch, unit)| **ch as u32 != **unit)
            .count()
    }

    /// Distinct characters currently appearing in keys.
    pub fn key_chars(&self) -> &BTreeSet<char> {
        &self.key_chars
    }

    /// Distinct characters currently appearing in string values.
    pub fn value_chars(&self) -> &BTreeSet<char> {
        &self.value_chars
    }

    /// Encode one character into an edge unit.
    ///
    /// Returns `None` when the character is not representable in the
    /// current mode; queries treat that as a miss.
    #[inline]
    pub fn encode(&self, ch: char) -> Option<u32> {
        match self.mode {
            EncodingMode::Ascii => {
                if ch.is_ascii() {
                    Some(ch as u32)
                } else {
                    None
                }
            }
            EncodingMode::Compressed => self.forward.get(&ch).copied(),
            EncodingMode::Wide => Some(ch as u32),
        }
    }

    /// Decode an edge unit back into its character.
    #[inline]
    pub fn decode(&self, unit: u32) -> Option<char> {
        match self.mode {
            EncodingMode::Ascii | EncodingMode::Wide => char::from_u32(unit),
            EncodingMode::Compressed => self.reverse.get(unit as usize).copied().flatten(),
        }
    }

    /// Whether `byte` currently serves as a remap target for a
    /// non-ASCII character.
    fn slot_in_use(&self, byte: u8) -> bool {
        matches!(self.reverse.get(byte as usize), Some(Some(ch)) if *ch as u32 != byte as u32)
    }

    /// Whether a key character can be inserted without a mode or slot
    /// transition.
    pub fn accepts_key_char(&self, ch: char) -> bool {
        match self.mode {
            EncodingMode::Ascii => ch.is_ascii(),
            EncodingMode::Compressed => {
                if self.forward.contains_key(&ch) {
                    true
                } else {
                    // A fresh ASCII character can pass through only if its
                    // byte is not already serving as a remap target.
                    ch.is_ascii() && !self.slot_in_use(ch as u8)
                }
            }
            EncodingMode::Wide => true,
        }
    }

    /// Whether a string-value character can be stored without a
    /// transition. Values persist as raw code points outside ASCII mode,
    /// so only ASCII mode and slot collisions constrain them.
    pub fn accepts_value_char(&self, ch: char) -> bool {
        match self.mode {
            EncodingMode::Ascii => ch.is_ascii(),
            EncodingMode::Compressed => !(ch.is_ascii() && self.slot_in_use(ch as u8)),
            EncodingMode::Wide => true,
        }
    }

    /// Record the characters of a key that the current mode accepts.
    ///
    /// Callers must have checked admissibility first; in Compressed mode
    /// this installs identity entries for new pass-through characters.
    pub fn admit_key(&mut self, key: &str) {
        for ch in key.chars() {
            debug_assert!(self.accepts_key_char(ch));
            if self.mode == EncodingMode::Compressed
                && ch.is_ascii()
                && !self.forward.contains_key(&ch)
            {
                self.forward.insert(ch, ch as u32);
                self.reverse[ch as usize] = Some(ch);
            }
            self.key_chars.insert(ch);
        }
    }

    /// Record the characters of a string value.
    pub fn admit_value(&mut self, value: &str) {
        for ch in value.chars() {
            debug_assert!(self.accepts_value_char(ch));
            self.value_chars.insert(ch);
        }
    }

    /// Smallest mode that fits the given working set.
    pub fn choose_mode(key_chars: &BTreeSet<char>, value_chars: &BTreeSet<char>) -> EncodingMode {
        let keys_ascii = key_chars.iter().all(|ch| ch.is_ascii());
        let values_ascii = value_chars.iter().all(|ch| ch.is_ascii());
        if keys_ascii && values_ascii && key_chars.len() <= 127 {
            return EncodingMode::Ascii;
        }
        if key_chars.len() <= COMPRESSED_LIMIT && compressed_fits(key_chars, value_chars) {
            return EncodingMode::Compressed;
        }
        EncodingMode::Wide
    }

    /// Build an alphabet for `mode` covering the given working set.
    ///
    /// Fails with [`DawgError::EncodingExceeded`] when a narrow mode
    /// cannot represent the data.
    pub fn build_for(
        mode: EncodingMode,
        key_chars: &BTreeSet<char>,
        value_chars: &BTreeSet<char>,
    ) -> Result<Self> {
        match mode {
            EncodingMode::Ascii => {
                if let Some(ch) = key_chars
                    .iter()
                    .chain(value_chars.iter())
                    .find(|ch| !ch.is_ascii())
                {
                    return Err(DawgError::EncodingExceeded(format!(
                        "{ch:?} is outside the ASCII range"
                    )));
                }
                let mut alphabet = Alphabet::new(mode);
                alphabet.key_chars = key_chars.clone();
                alphabet.value_chars = value_chars.clone();
                Ok(alphabet)
            }
            EncodingMode::Compressed => {
                if key_chars.len() > COMPRESSED_LIMIT {
                    return Err(DawgError::EncodingExceeded(format!(
                        "{} distinct key code points exceed the {COMPRESSED_LIMIT}-unit budget",
                        key_chars.len()
                    )));
                }
                let mut alphabet = Alphabet::new(mode);
                // Pass-through entries first so slot assignment can see
                // every occupied byte.
                for &ch in key_chars.iter().filter(|ch| ch.is_ascii()) {
                    alphabet.forward.insert(ch, ch as u32);
                    alphabet.reverse[ch as usize] = Some(ch);
                }
                let used: BTreeSet<char> = key_chars.union(value_chars).copied().collect();
                let mut free_slots = REMAP_SLOTS
                    .iter()
                    .copied()
                    .filter(|byte| !used.contains(&(*byte as char)));
                for &ch in key_chars.iter().filter(|ch| !ch.is_ascii()) {
                    let slot = free_slots.next().ok_or_else(|| {
                        DawgError::EncodingExceeded(
                            "no free remap slots for the non-ASCII working set".to_string(),
                        )
                    })?;
                    alphabet.forward.insert(ch, slot as u32);
                    alphabet.reverse[slot as usize] = Some(ch);
                }
                alphabet.key_chars = key_chars.clone();
                alphabet.value_chars = value_chars.clone();
                Ok(alphabet)
            }
            EncodingMode::Wide => {
                let mut alphabet = Alphabet::new(mode);
                alphabet.key_chars = key_chars.clone();
                alphabet.value_chars = value_chars.clone();
                Ok(alphabet)
            }
        }
    }

    /// Infallible wide alphabet over a working set.
    pub fn wide_for(key_chars: &BTreeSet<char>, value_chars: &BTreeSet<char>) -> Self {
        let mut alphabet = Alphabet::new(EncodingMode::Wide);
        alphabet.key_chars = key_chars.clone();
        alphabet.value_chars = value_chars.clone();
        alphabet
    }

    /// Reconstruct a Compressed-7 alphabet from explicit non-identity
    /// mappings (container character map, or the text document's map).
    ///
    /// Pass-through entries are installed lazily as keys are re-added.
    pub fn from_mapping(entries: &[(char, u8)]) -> Self {
        let mut alphabet = Alphabet::new(EncodingMode::Compressed);
        for &(ch, byte) in entries {
            alphabet.forward.insert(ch, byte as u32);
            alphabet.reverse[byte as usize] = Some(ch);
        }
        alphabet
    }

    /// The non-identity forward entries, sorted by mapped byte.
    ///
    /// Empty outside Compressed mode.
    pub fn char_map(&self) -> Vec<(char, u8)> {
        let mut entries: Vec<(char, u8)> = self
            .forward
            .iter()
            .filter(|(ch, unit)| **ch as u32 != **unit)
            .map(|(ch, unit)| (*ch, *unit as u8))
            .collect();
        entries.sort_by_key(|(_, byte)| *byte);
        entries
    }
}

/// Whether every non-ASCII key character can be assigned a collision-free
/// remap slot.
fn compressed_fits(key_chars: &BTreeSet<char>, value_chars: &BTreeSet<char>) -> bool {
    let needed = key_chars.iter().filter(|ch| !ch.is_ascii()).count();
    let used: BTreeSet<char> = key_chars.union(value_chars).copied().collect();
    let free = REMAP_SLOTS
        .iter()
        .filter(|byte| !used.contains(&(**byte as char)))
        .count();
    needed <= free
}
