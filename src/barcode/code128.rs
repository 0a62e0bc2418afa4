//! Code128 symbology.
//!
//! Converts an ASCII payload into a sequence of Code128 symbol values
//! (start, data, checksum) and from there into a run of bar/space modules.
//!
//! Code set selection:
//! - start in C when the payload opens with four or more digits, or is an
//!   even-length run of digits
//! - otherwise start in A if the first character is a control character, else B
//! - inside A/B, switch to C for a digit run of six or more, or four or more
//!   that reaches the end of the payload (an odd leading digit stays in A/B)
//! - leave C when fewer than two digits remain at the cursor

use thiserror::Error;

/// Bar/space widths for symbol values 0..=105, bar first.
const PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1], [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1], [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2],
];

/// Stop pattern including the final termination bar.
const STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;

/// Modules per data symbol
pub const SYMBOL_MODULES: usize = 11;

/// Modules in the stop pattern
pub const STOP_MODULES: usize = 13;

/// Errors from symbol encoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Payload is empty")]
    Empty,

    #[error("Character {ch:?} at position {position} is not encodable in Code128")]
    Unsupported { ch: char, position: usize },
}

/// Code128 code sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSet {
    /// Uppercase, digits, punctuation and ASCII control characters
    A,
    /// Printable ASCII including lowercase
    B,
    /// Digit pairs 00-99
    C,
}

impl CodeSet {
    fn start_symbol(self) -> u8 {
        match self {
            CodeSet::A => START_A,
            CodeSet::B => START_B,
            CodeSet::C => START_C,
        }
    }

    fn switch_symbol(self) -> u8 {
        match self {
            CodeSet::A => CODE_A,
            CodeSet::B => CODE_B,
            CodeSet::C => CODE_C,
        }
    }

    fn for_byte(byte: u8) -> Self {
        if byte < 32 {
            CodeSet::A
        } else {
            CodeSet::B
        }
    }

    fn accepts(self, byte: u8) -> bool {
        match self {
            CodeSet::A => byte < 96,
            CodeSet::B => (32..128).contains(&byte),
            CodeSet::C => byte.is_ascii_digit(),
        }
    }

    /// Symbol value of a single character in A or B
    fn value_of(self, byte: u8) -> u8 {
        match self {
            CodeSet::A if byte < 32 => byte + 64,
            _ => byte - 32,
        }
    }
}

/// An encoded Code128 symbol sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    /// Start symbol followed by data symbols (no checksum, no stop)
    symbols: Vec<u8>,
    checksum: u8,
}

impl Code128 {
    /// Encode an ASCII payload
    pub fn encode(payload: &str) -> Result<Self, EncodeError> {
        if payload.is_empty() {
            return Err(EncodeError::Empty);
        }

        if let Some((position, ch)) = payload.chars().enumerate().find(|(_, c)| !c.is_ascii()) {
            return Err(EncodeError::Unsupported { ch, position });
        }

        let bytes = payload.as_bytes();
        let mut set = initial_set(bytes);
        let mut symbols = Vec::with_capacity(bytes.len() + 2);
        symbols.push(set.start_symbol());

        let mut i = 0;
        while i < bytes.len() {
            if set == CodeSet::C {
                if digit_run(bytes, i) >= 2 {
                    symbols.push((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
                    i += 2;
                } else {
                    set = CodeSet::for_byte(bytes[i]);
                    symbols.push(set.switch_symbol());
                }
                continue;
            }

            let run = digit_run(bytes, i);
            if run >= 6 || (run >= 4 && i + run == bytes.len()) {
                if run % 2 == 1 {
                    symbols.push(set.value_of(bytes[i]));
                    i += 1;
                }
                set = CodeSet::C;
                symbols.push(CODE_C);
                continue;
            }

            let byte = bytes[i];
            if !set.accepts(byte) {
                set = if set == CodeSet::A { CodeSet::B } else { CodeSet::A };
                symbols.push(set.switch_symbol());
            }
            symbols.push(set.value_of(byte));
            i += 1;
        }

        let checksum = checksum(&symbols);
        Ok(Self { symbols, checksum })
    }

    /// Start and data symbols, without checksum or stop
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Modulo-103 check symbol
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Code set the symbol opens with
    pub fn start_set(&self) -> CodeSet {
        match self.symbols[0] {
            START_A => CodeSet::A,
            START_C => CodeSet::C,
            _ => CodeSet::B,
        }
    }

    /// Total width in modules, excluding quiet zones
    pub fn module_count(&self) -> usize {
        (self.symbols.len() + 1) * SYMBOL_MODULES + STOP_MODULES
    }

    /// Expand into modules: `true` is a bar, `false` a space
    pub fn modules(&self) -> Vec<bool> {
        let mut modules = Vec::with_capacity(self.module_count());
        let widths = self
            .symbols
            .iter()
            .chain(std::iter::once(&self.checksum))
            .flat_map(|&s| PATTERNS[usize::from(s)].iter())
            .chain(STOP.iter());

        let mut bar = true;
        for &width in widths {
            modules.extend(std::iter::repeat(bar).take(usize::from(width)));
            bar = !bar;
        }
        modules
    }
}

fn initial_set(bytes: &[u8]) -> CodeSet {
    let run = digit_run(bytes, 0);
    if run >= 4 || (run == bytes.len() && run % 2 == 0) {
        CodeSet::C
    } else {
        CodeSet::for_byte(bytes[0])
    }
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Weighted sum mod 103, reduced at every step so long payloads cannot overflow
fn checksum(symbols: &[u8]) -> u8 {
    let sum = symbols.iter().enumerate().fold(0u32, |acc, (position, &s)| {
        let weight = (position.max(1) % 103) as u32;
        (acc + u32::from(s) * weight) % 103
    });
    sum as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_are_eleven_modules() {
        for (value, pattern) in PATTERNS.iter().enumerate() {
            let width: u8 = pattern.iter().sum();
            assert_eq!(width, 11, "symbol {} has width {}", value, width);
        }
        assert_eq!(STOP.iter().sum::<u8>(), 13);
    }

    #[test]
    fn test_code_b_with_short_digit_run() {
        let code = Code128::encode("PJJ123C").unwrap();
        assert_eq!(code.symbols(), &[104, 48, 42, 42, 17, 18, 19, 35]);
        assert_eq!(code.checksum(), 55);
        assert_eq!(code.start_set(), CodeSet::B);
    }

    #[test]
    fn test_serial_stays_in_code_b() {
        let code = Code128::encode("SN001").unwrap();
        assert_eq!(code.symbols(), &[104, 51, 46, 16, 16, 17]);
        assert_eq!(code.checksum(), 32);
    }

    #[test]
    fn test_all_digits_use_code_c() {
        let code = Code128::encode("1234").unwrap();
        assert_eq!(code.symbols(), &[105, 12, 34]);
        assert_eq!(code.checksum(), 82);
    }

    #[test]
    fn test_odd_digit_tail_switches_to_b() {
        let code = Code128::encode("123456789").unwrap();
        assert_eq!(code.symbols(), &[105, 12, 34, 56, 78, 100, 25]);
        assert_eq!(code.checksum(), 79);
    }

    #[test]
    fn test_interior_digit_run_switches_to_c() {
        let code = Code128::encode("AB123456").unwrap();
        assert_eq!(code.symbols(), &[104, 33, 34, 99, 12, 34, 56]);
        assert_eq!(code.checksum(), 26);
    }

    #[test]
    fn test_control_characters_use_code_a() {
        let code = Code128::encode("\tA").unwrap();
        assert_eq!(code.symbols(), &[103, 73, 33]);
        assert_eq!(code.checksum(), 36);

        let mixed = Code128::encode("\ta").unwrap();
        assert_eq!(mixed.symbols(), &[103, 73, 100, 65]);
    }

    #[test]
    fn test_module_count_matches_expansion() {
        let code = Code128::encode("SN001").unwrap();
        let modules = code.modules();
        assert_eq!(modules.len(), code.module_count());
        assert_eq!(modules.len(), 7 * 11 + 13);
        assert!(modules[0], "first module must be a bar");
        assert!(*modules.last().unwrap(), "termination bar closes the symbol");
    }

    #[test]
    fn test_checksum_of_long_payload() {
        let code = Code128::encode(&"~".repeat(20_000)).unwrap();

        let expected = code
            .symbols()
            .iter()
            .enumerate()
            .map(|(position, &s)| u64::from(s) * position.max(1) as u64)
            .sum::<u64>()
            % 103;
        assert_eq!(u64::from(code.checksum()), expected);
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert_eq!(Code128::encode(""), Err(EncodeError::Empty));
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert_eq!(
            Code128::encode("SNé1"),
            Err(EncodeError::Unsupported { ch: 'é', position: 2 })
        );
    }
}
