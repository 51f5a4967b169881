//! Key sequence table
//!
//! Maps the exact character sequences terminals send to symbolic
//! capabilities. Built from compiled-in defaults covering PC-style, VT220,
//! xterm and rxvt terminals, optionally overlaid with what the local
//! terminal's capability database reports.

use crate::capability::{modifiers_from_param, terminfo_key_codes, Capability, Key, KeypadKey};
use crate::terminfo::CapabilityDatabase;
use crate::text::Encoding;
use crate::ESC;
use crossterm::event::KeyModifiers;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Lead markers of legacy mouse reports
const DEFAULT_MOUSE_LEADS: [&str; 2] = ["\x1b[M", "\x1b>M"];

/// Cursor position report format without the `%i` (one-based) marker
const DEFAULT_CURSOR_REPORT: &str = "\x1b[%d;%dR";

/// Final characters shared by the CSI and SS3 cursor keys
const CURSOR_FINALS: [(char, Key); 7] = [
    ('A', Key::Up),
    ('B', Key::Down),
    ('C', Key::Right),
    ('D', Key::Left),
    ('H', Key::Home),
    ('F', Key::End),
    ('E', Key::Begin),
];

/// Editing keys sent as `CSI n ~` that also take xterm modifiers
const MODIFIABLE_TILDE_KEYS: [(u32, Key); 4] = [
    (2, Key::Insert),
    (3, Key::Delete),
    (5, Key::PageUp),
    (6, Key::PageDown),
];

/// Sequence table with the sequences preferred when resolving a capability
#[derive(Debug, Clone)]
pub struct Keymap {
    sequences: HashMap<String, Capability>,
    preferred: HashMap<Capability, String>,
    prefixes: HashSet<String>,
    max_len: usize,
    mouse_leads: Vec<String>,
    cursor_report_format: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Keymap {
    /// A table with no entries and the default report markers
    pub fn empty() -> Self {
        Self {
            sequences: HashMap::new(),
            preferred: HashMap::new(),
            prefixes: HashSet::new(),
            max_len: 0,
            mouse_leads: DEFAULT_MOUSE_LEADS.iter().map(|s| s.to_string()).collect(),
            cursor_report_format: DEFAULT_CURSOR_REPORT.to_string(),
        }
    }

    /// The compiled-in table
    pub fn defaults() -> Self {
        let mut keymap = Self::empty();
        for (seq, cap) in default_entries() {
            keymap.insert(&seq, cap);
        }
        keymap
    }

    /// Defaults overlaid with the key capabilities a terminal database
    /// reports, decoded with the session encoding
    pub fn with_database(db: &dyn CapabilityDatabase, encoding: Encoding) -> Self {
        let mut keymap = Self::defaults();
        let mut overlaid = 0;

        for (code, cap) in terminfo_key_codes() {
            if cap.key_code().is_some_and(is_default_alias) {
                continue;
            }
            let Some(bytes) = db.get_str(&code) else {
                continue;
            };
            let seq = encoding.decode(bytes);
            if seq.is_empty() || seq == ESC.to_string() {
                continue;
            }
            keymap.overlay(&seq, cap);
            overlaid += 1;
        }

        if let Some(bytes) = db.get_str("kmous") {
            let lead = encoding.decode(bytes);
            if lead.ends_with('M') && !keymap.mouse_leads.contains(&lead) {
                debug!("Adding mouse lead marker {:?} from terminal database", lead);
                keymap.mouse_leads.push(lead);
            }
        }

        if let Some(bytes) = db.get_str("u6") {
            keymap.cursor_report_format = encoding.decode(bytes);
        }

        debug!(
            "Overlaid {} terminal database sequences onto {} defaults",
            overlaid,
            keymap.len()
        );
        keymap
    }

    /// Add a sequence, keeping any sequence already preferred for the
    /// capability
    pub fn insert(&mut self, seq: &str, cap: Capability) {
        self.index(seq);
        self.sequences.insert(seq.to_string(), cap);
        self.preferred
            .entry(cap)
            .or_insert_with(|| seq.to_string());
    }

    /// Add a sequence that replaces whatever the same sequence meant before
    /// and becomes the preferred sequence for the capability
    pub fn overlay(&mut self, seq: &str, cap: Capability) {
        self.index(seq);
        if let Some(previous) = self.sequences.insert(seq.to_string(), cap) {
            if previous != cap {
                debug!("Sequence {:?} rebound from {} to {}", seq, previous, cap);
            }
        }
        self.preferred.insert(cap, seq.to_string());
    }

    fn index(&mut self, seq: &str) {
        self.max_len = self.max_len.max(seq.len());
        for (i, _) in seq.char_indices().skip(1) {
            self.prefixes.insert(seq[..i].to_string());
        }
    }

    /// Byte sequence for a capability, if this session supports it
    pub fn resolve(&self, cap: Capability) -> Option<&str> {
        match cap {
            Capability::MouseReport => self.mouse_leads.first().map(String::as_str),
            Capability::CursorReport => Some(&self.cursor_report_format),
            _ => self.preferred.get(&cap).map(String::as_str),
        }
    }

    /// Exact lookup
    pub fn lookup(&self, seq: &str) -> Option<Capability> {
        self.sequences.get(seq).copied()
    }

    /// Longest table sequence that prefixes `input`.
    ///
    /// A lone ESC never matches here: whether it is a key press or the start
    /// of a sequence is decided by the decoder.
    pub fn longest_prefix(&self, input: &str) -> Option<(usize, Capability)> {
        let longest = self.max_len.min(input.len());
        (1..=longest)
            .rev()
            .filter(|&len| input.is_char_boundary(len))
            .map(|len| &input[..len])
            .filter(|candidate| *candidate != "\x1b")
            .find_map(|candidate| self.lookup(candidate).map(|cap| (candidate.len(), cap)))
    }

    /// Whether `input` is a proper prefix of some table sequence
    pub fn is_strict_prefix(&self, input: &str) -> bool {
        self.prefixes.contains(input)
    }

    pub fn is_mouse_lead(&self, seq: &str) -> bool {
        self.mouse_leads.iter().any(|lead| lead == seq)
    }

    pub fn mouse_leads(&self) -> &[String] {
        &self.mouse_leads
    }

    pub fn cursor_report_format(&self) -> &str {
        &self.cursor_report_format
    }

    /// Whether the report format carries the `%i` marker
    pub fn cursor_report_one_based(&self) -> bool {
        self.cursor_report_format.contains("%i")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Capability)> {
        self.sequences.iter().map(|(seq, cap)| (seq.as_str(), *cap))
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Keys bound to fixed control characters by the defaults; the database
/// does not get to rebind them
fn is_default_alias(key: Key) -> bool {
    matches!(key, Key::Backspace | Key::Tab | Key::Enter | Key::Escape)
}

fn default_entries() -> Vec<(String, Capability)> {
    let key = Capability::key;
    let modified = |k, param| Capability::Key(k, modifiers_from_param(param));
    let mut entries: Vec<(String, Capability)> = Vec::new();
    let mut add = |seq: String, cap: Capability| entries.push((seq, cap));

    // Control characters
    add("\r".into(), key(Key::Enter));
    add("\n".into(), key(Key::Enter));
    add("\t".into(), key(Key::Tab));
    add("\x08".into(), key(Key::Backspace));
    add("\x7f".into(), key(Key::Backspace));
    add("\x1b".into(), key(Key::Escape));

    // PC-style cursor keys, normal and application mode
    for (c, k) in CURSOR_FINALS {
        add(format!("\x1b[{c}"), key(k));
        add(format!("\x1bO{c}"), key(k));
    }
    add("\x1b[Z".into(), key(Key::BackTab));
    add("\x1b[U".into(), key(Key::PageDown));
    add("\x1b[V".into(), key(Key::PageUp));

    // SS3 function keys
    for (i, c) in ['P', 'Q', 'R', 'S'].into_iter().enumerate() {
        add(format!("\x1bO{c}"), key(Key::F(i as u8 + 1)));
    }

    // VT220 keypad in application mode
    for c in "pqrstuvwxyjklmnoXM".chars() {
        if let Some(pad) = KeypadKey::from_ss3(c) {
            add(format!("\x1bO{c}"), key(Key::Keypad(pad)));
        }
    }

    // VT220 editing and function keys
    let tilde_numbers = (1..=8)
        .chain(11..=15)
        .chain(17..=21)
        .chain(23..=26)
        .chain(28..=29)
        .chain(31..=34);
    for n in tilde_numbers {
        if let Some(k) = Key::from_tilde_number(n) {
            add(format!("\x1b[{n}~"), key(k));
        }
    }

    // xterm modified keys (kUP5, kHOM6, kDC3, ...). CSI 1;m R is left to
    // the cursor report grammar.
    for param in 2..=7 {
        for (c, k) in CURSOR_FINALS {
            add(format!("\x1b[1;{param}{c}"), modified(k, param));
        }
        for (c, n) in [('P', 1), ('Q', 2), ('S', 4)] {
            add(format!("\x1b[1;{param}{c}"), modified(Key::F(n), param));
        }
        for (n, k) in MODIFIABLE_TILDE_KEYS {
            add(format!("\x1b[{n};{param}~"), modified(k, param));
        }
    }

    // Linux console function keys
    for (i, c) in ['A', 'B', 'C', 'D', 'E'].into_iter().enumerate() {
        add(format!("\x1b[[{c}"), key(Key::F(i as u8 + 1)));
    }

    // rxvt
    for (c, k) in [('a', Key::Up), ('b', Key::Down), ('c', Key::Right), ('d', Key::Left)] {
        add(format!("\x1b[{c}"), Capability::Key(k, KeyModifiers::SHIFT));
        add(format!("\x1bO{c}"), Capability::Key(k, KeyModifiers::CONTROL));
    }
    for n in [2, 3, 5, 6, 7, 8] {
        if let Some(k) = Key::from_tilde_number(n) {
            add(format!("\x1b[{n}^"), Capability::Key(k, KeyModifiers::CONTROL));
            add(format!("\x1b[{n}$"), Capability::Key(k, KeyModifiers::SHIFT));
            add(
                format!("\x1b[{n}@"),
                Capability::Key(k, KeyModifiers::CONTROL | KeyModifiers::SHIFT),
            );
        }
    }

    // Focus and bracketed paste markers
    add("\x1b[I".into(), Capability::FocusIn);
    add("\x1b[O".into(), Capability::FocusOut);
    add("\x1b[200~".into(), Capability::PasteBegin);
    add("\x1b[201~".into(), Capability::PasteEnd);

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminfo::Terminfo;

    #[test]
    fn test_defaults_resolve() {
        let keymap = Keymap::defaults();
        assert_eq!(keymap.resolve(Capability::key(Key::Up)), Some("\x1b[A"));
        assert_eq!(keymap.resolve(Capability::key(Key::Escape)), Some("\x1b"));
        assert_eq!(
            keymap.resolve(Capability::Key(Key::Up, KeyModifiers::CONTROL)),
            Some("\x1b[1;5A")
        );
        assert_eq!(
            keymap.resolve(Capability::Key(Key::Home, KeyModifiers::CONTROL | KeyModifiers::SHIFT)),
            Some("\x1b[1;6H")
        );
        assert_eq!(keymap.resolve(Capability::MouseReport), Some("\x1b[M"));
        assert_eq!(keymap.resolve(Capability::key(Key::F(40))), None);
        assert!(!keymap.cursor_report_one_based());
    }

    #[test]
    fn test_lookup_is_exact() {
        let keymap = Keymap::defaults();
        assert_eq!(keymap.lookup("\x1b[A"), Some(Capability::key(Key::Up)));
        assert_eq!(keymap.lookup("\x1b[Ax"), None);
        assert_eq!(keymap.lookup("\x1b["), None);
    }

    #[test]
    fn test_longest_prefix() {
        let keymap = Keymap::defaults();
        assert_eq!(
            keymap.longest_prefix("\x1b[1;5Cabc"),
            Some((6, Capability::Key(Key::Right, KeyModifiers::CONTROL)))
        );
        assert_eq!(
            keymap.longest_prefix("\x1b[200~hello"),
            Some((6, Capability::PasteBegin))
        );
        assert_eq!(keymap.longest_prefix("\x1b"), None);
        assert_eq!(keymap.longest_prefix("\x1bx"), None);
        assert_eq!(keymap.longest_prefix("\x7fa"), Some((1, Capability::key(Key::Backspace))));
    }

    #[test]
    fn test_strict_prefixes() {
        let keymap = Keymap::defaults();
        assert!(keymap.is_strict_prefix("\x1b"));
        assert!(keymap.is_strict_prefix("\x1b[20"));
        assert!(!keymap.is_strict_prefix("\x1b[A"));
        assert!(!keymap.is_strict_prefix("a"));
    }

    #[test]
    fn test_database_overlay_replaces_same_sequence() {
        let db = Terminfo::new()
            .with_str("kf13", "\x1b[1;2P")
            .with_str("kcuu1", "\x1bOA")
            .with_str("kbs", "\x08")
            .with_str("kmous", "\x1b[<");
        let keymap = Keymap::with_database(&db, Encoding::Utf8);

        // Sequence rebound to what the terminal says it means
        assert_eq!(keymap.lookup("\x1b[1;2P"), Some(Capability::key(Key::F(13))));
        // Overlay sequence preferred, default still recognized
        assert_eq!(keymap.resolve(Capability::key(Key::Up)), Some("\x1bOA"));
        assert_eq!(keymap.lookup("\x1b[A"), Some(Capability::key(Key::Up)));
        // Control-character aliases keep their defaults
        assert_eq!(keymap.resolve(Capability::key(Key::Backspace)), Some("\x08"));
        // SGR introducer is not a legacy lead marker
        assert_eq!(keymap.mouse_leads().len(), 2);
    }

    #[test]
    fn test_database_report_formats() {
        let db = Terminfo::new()
            .with_str("kmous", "\x1b[5M")
            .with_str("u6", "\x1b[%i%d;%dR");
        let keymap = Keymap::with_database(&db, Encoding::Utf8);
        assert!(keymap.is_mouse_lead("\x1b[5M"));
        assert!(keymap.cursor_report_one_based());
        assert_eq!(keymap.resolve(Capability::CursorReport), Some("\x1b[%i%d;%dR"));
    }

    #[test]
    fn test_database_strings_use_session_encoding() {
        let db = Terminfo::new().with_str("kf20", b"\x1b[\xe9~".to_vec());
        let keymap = Keymap::with_database(&db, Encoding::Latin1);
        assert_eq!(keymap.lookup("\x1b[\u{e9}~"), Some(Capability::key(Key::F(20))));
    }
}
