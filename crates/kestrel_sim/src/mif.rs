//! Reader for memory initialization files (`.mif`).
//!
//! ```text
//! -- 4 x 8 ROM
//! WIDTH=8;
//! DEPTH=4;
//! ADDRESS_RADIX=HEX;
//! DATA_RADIX=HEX;
//! CONTENT
//! BEGIN
//!     0 : 3F;
//!     1 : A0;   % block comments may
//!                 span lines %
//! END;
//! ```
//!
//! Whitespace is insignificant and keywords are case-insensitive. The
//! declared width and depth must match the memory being initialized.

use kestrel_common::{bits_to_u64, parse_radix_bits, Logic, Radix, RadixError};

/// What went wrong in a `.mif` file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MifErrorKind {
    /// A required header symbol was not declared before `CONTENT`.
    #[error("missing {0} declaration")]
    MissingSymbol(&'static str),

    /// A header value is not a number.
    #[error("{symbol} value '{value}' is not a number")]
    InvalidNumber {
        /// Header symbol.
        symbol: String,
        /// Offending value.
        value: String,
    },

    /// `WIDTH` differs from the memory's data width.
    #[error("WIDTH is {declared} but the memory is {expected} bits wide")]
    WidthMismatch {
        /// Declared width.
        declared: u64,
        /// Memory data width.
        expected: usize,
    },

    /// `DEPTH` differs from the memory's word count.
    #[error("DEPTH is {declared} but the memory has {expected} words")]
    DepthMismatch {
        /// Declared depth.
        declared: u64,
        /// Memory word count.
        expected: usize,
    },

    /// An unknown radix keyword.
    #[error("{symbol} '{value}' is not one of BIN, OCT, DEC, HEX")]
    InvalidRadix {
        /// Header symbol.
        symbol: &'static str,
        /// Offending value.
        value: String,
    },

    /// An address or data literal does not fit its radix or width.
    #[error("{0}")]
    Literal(#[from] RadixError),

    /// An address at or beyond `DEPTH`.
    #[error("address {address} is out of range for depth {depth}")]
    AddressOutOfRange {
        /// Decoded address.
        address: u64,
        /// Memory word count.
        depth: usize,
    },

    /// A line that fits none of the expected forms.
    #[error("syntax error near '{0}'")]
    Syntax(String),

    /// The file ended before `END;`.
    #[error("missing END;")]
    UnexpectedEnd,
}

/// A `.mif` error with the line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct MifError {
    /// 1-based line number.
    pub line: usize,
    /// What went wrong.
    pub kind: MifErrorKind,
}

impl MifError {
    /// Creates an error at `line`.
    pub fn new(line: usize, kind: MifErrorKind) -> Self {
        Self { line, kind }
    }
}

/// One initialized word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MifWord {
    /// Word address.
    pub address: usize,
    /// Data bits, least significant first.
    pub bits: Vec<Logic>,
}

enum Section {
    Header,
    Content,
    Body,
}

#[derive(Default)]
struct Header {
    width: Option<u64>,
    depth: Option<u64>,
    address_radix: Option<Radix>,
    data_radix: Option<Radix>,
}

/// Parses a `.mif` file for a memory with `addr_width` address bits and
/// `data_width` data bits.
pub fn parse_mif(text: &str, addr_width: usize, data_width: usize) -> Result<Vec<MifWord>, MifError> {
    let depth = 1usize << addr_width;
    let mut header = Header::default();
    let mut section = Section::Header;
    let mut words = Vec::new();

    for (index, line) in preprocess(text).iter().enumerate() {
        let number = index + 1;
        let err = |kind| MifError::new(number, kind);
        if line.is_empty() {
            continue;
        }

        match section {
            Section::Header => {
                if line == "CONTENT" || line == "CONTENTBEGIN" {
                    check_header(&header, depth, data_width).map_err(err)?;
                    section = if line == "CONTENT" {
                        Section::Content
                    } else {
                        Section::Body
                    };
                    continue;
                }
                let (symbol, value) = line
                    .strip_suffix(';')
                    .and_then(|l| l.split_once('='))
                    .ok_or_else(|| err(MifErrorKind::Syntax(line.clone())))?;
                read_symbol(&mut header, symbol, value).map_err(err)?;
            }
            Section::Content => {
                if line != "BEGIN" {
                    return Err(err(MifErrorKind::Syntax(line.clone())));
                }
                section = Section::Body;
            }
            Section::Body => {
                if line == "END;" {
                    return Ok(words);
                }
                let (address, data) = line
                    .strip_suffix(';')
                    .and_then(|l| l.split_once(':'))
                    .ok_or_else(|| err(MifErrorKind::Syntax(line.clone())))?;
                // Both radices are known once the body is reached.
                let address_radix = header.address_radix.unwrap_or(Radix::Hex);
                let data_radix = header.data_radix.unwrap_or(Radix::Hex);

                let address_bits = parse_radix_bits(address, address_radix, 64)
                    .map_err(|e| err(MifErrorKind::Literal(e)))?;
                let address = bits_to_u64(&address_bits).unwrap_or(u64::MAX);
                if address >= depth as u64 {
                    return Err(err(MifErrorKind::AddressOutOfRange { address, depth }));
                }
                let bits = parse_radix_bits(data, data_radix, data_width)
                    .map_err(|e| err(MifErrorKind::Literal(e)))?;
                words.push(MifWord {
                    address: address as usize,
                    bits,
                });
            }
        }
    }

    Err(MifError::new(text.lines().count().max(1), MifErrorKind::UnexpectedEnd))
}

/// Strips `--` line comments and `%...%` block comments, removes all
/// whitespace and uppercases. Line numbering is preserved.
fn preprocess(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut in_block = false;
    for raw in text.lines() {
        let mut line = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if in_block {
                if c == '%' {
                    in_block = false;
                }
                continue;
            }
            match c {
                '%' => in_block = true,
                '-' if chars.peek() == Some(&'-') => break,
                c if c.is_whitespace() => {}
                c => line.push(c.to_ascii_uppercase()),
            }
        }
        lines.push(line);
    }
    lines
}

fn read_symbol(header: &mut Header, symbol: &str, value: &str) -> Result<(), MifErrorKind> {
    let number = || {
        value.parse::<u64>().map_err(|_| MifErrorKind::InvalidNumber {
            symbol: symbol.to_string(),
            value: value.to_string(),
        })
    };
    let radix = |symbol: &'static str| {
        Radix::from_name(value).ok_or_else(|| MifErrorKind::InvalidRadix {
            symbol,
            value: value.to_string(),
        })
    };
    match symbol {
        "WIDTH" => header.width = Some(number()?),
        "DEPTH" => header.depth = Some(number()?),
        "ADDRESS_RADIX" => header.address_radix = Some(radix("ADDRESS_RADIX")?),
        "DATA_RADIX" => header.data_radix = Some(radix("DATA_RADIX")?),
        // Other symbols are legal and ignored.
        _ => {}
    }
    Ok(())
}

fn check_header(header: &Header, depth: usize, data_width: usize) -> Result<(), MifErrorKind> {
    let width = header.width.ok_or(MifErrorKind::MissingSymbol("WIDTH"))?;
    if width != data_width as u64 {
        return Err(MifErrorKind::WidthMismatch {
            declared: width,
            expected: data_width,
        });
    }
    let declared_depth = header.depth.ok_or(MifErrorKind::MissingSymbol("DEPTH"))?;
    if declared_depth != depth as u64 {
        return Err(MifErrorKind::DepthMismatch {
            declared: declared_depth,
            expected: depth,
        });
    }
    header
        .address_radix
        .ok_or(MifErrorKind::MissingSymbol("ADDRESS_RADIX"))?;
    header
        .data_radix
        .ok_or(MifErrorKind::MissingSymbol("DATA_RADIX"))?;
    Ok(())
}
