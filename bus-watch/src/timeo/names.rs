//! Display-name normalization.
//!
//! The upstream feed shouts its labels in all-caps ("PORTE DE PARIS",
//! "CHU COTE DE NACRE"). `smart_capitalize` rebuilds a readable French
//! label: determiners stay lower-case and known acronyms go fully
//! upper-case, while everything else gets a leading capital.

/// Words that are never capitalized.
const DETERMINERS: [&str; 12] = [
    "de", "du", "des", "au", "aux", "à", "la", "le", "les", "d", "et", "l",
];

/// Words that are always fully upper-cased.
const ACRONYMS: [&str; 12] = [
    "sncf", "chu", "chr", "crous", "suaps", "fpa", "za", "zi", "zac", "cpam", "efs", "mjc",
];

/// Capitalize a raw label for display.
///
/// The input is lower-cased, split on spaces and apostrophes, each token
/// fixed up per the rules above, and reassembled with its original
/// delimiters in place. Pure string transform; applying it twice gives the
/// same result as applying it once.
pub fn smart_capitalize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut word = String::new();

    for c in lower.chars() {
        if c == ' ' || c == '\'' {
            push_fixed(&mut out, &word);
            out.push(c);
            word.clear();
        } else {
            word.push(c);
        }
    }

    push_fixed(&mut out, &word);
    out
}

fn push_fixed(out: &mut String, word: &str) {
    if DETERMINERS.contains(&word) {
        out.push_str(word);
    } else if ACRONYMS.contains(&word) {
        // Unicode-aware so accented acronyms upper-case correctly.
        out.extend(word.chars().flat_map(char::to_uppercase));
    } else {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
}
