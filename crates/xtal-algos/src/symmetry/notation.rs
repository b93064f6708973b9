//! Jones-Faithful notation parsing and formatting
//!
//! Accepts the forms used by crystallographic file formats:
//!
//! - `x,-y,z+1/2`, `1/2+x,y,-z`, `x-y,x,z+0.5` (coordinate triplets)
//! - `x1,x2,-x3,x4+1/2` (superspace labels for 3+d dimensions)
//! - `[[1,0,0,0],[0,-1,0,0.5],[0,0,1,0],[0,0,0,1]]` (row-major matrix literal)
//! - `xyz matrix: 1 0 0 0 0 -1 0 0.5 0 0 1 0 0 0 0 1`
//!
//! A leading `!` requests the inverse operation; it is stripped here and
//! reported in [`ParsedNotation::inverse`].

use num_rational::Rational32;
use num_traits::{One, Signed, Zero};

use super::error::NotationError;
use super::twelfths::Twelfths;
use crate::linalg::RationalMatrix;

/// Options controlling how notation is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotationOptions {
    /// Number of incommensurate modulation dimensions (0 for ordinary groups)
    pub modulation_dim: usize,
    /// Fold translations into (−½, ½]
    pub normalize: bool,
    /// Accept integer or fractional coefficients such as `2x` (supercell strings)
    pub allow_scaling: bool,
}

impl Default for NotationOptions {
    fn default() -> Self {
        Self {
            modulation_dim: 0,
            normalize: true,
            allow_scaling: false,
        }
    }
}

impl NotationOptions {
    #[inline]
    pub fn dim(&self) -> usize {
        3 + self.modulation_dim
    }
}

/// Affine matrix read from notation, before any inversion
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNotation {
    pub rotation: RationalMatrix,
    pub translation: Vec<Twelfths>,
    /// Notation carried a leading `!`
    pub inverse: bool,
}

/// Parse any supported notation form
pub fn parse_notation(text: &str, opts: NotationOptions) -> Result<ParsedNotation, NotationError> {
    let trimmed = text.trim();
    let (inverse, body) = match trimmed.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    if body.is_empty() {
        return Err(NotationError::EmptyNotation);
    }
    let lower = body.to_lowercase();
    let (rotation, translation) = if lower.starts_with("[[") {
        parse_matrix_values(&lower.replace(|c| matches!(c, '[' | ']' | ','), " "), opts)?
    } else if let Some(values) = lower.strip_prefix("xyz matrix:") {
        parse_matrix_values(values, opts)?
    } else {
        parse_triplet(&lower, opts)?
    };
    Ok(ParsedNotation {
        rotation,
        translation,
        inverse,
    })
}

fn parse_triplet(
    text: &str,
    opts: NotationOptions,
) -> Result<(RationalMatrix, Vec<Twelfths>), NotationError> {
    let n = opts.dim();
    let rows: Vec<&str> = text.split(',').collect();
    if rows.len() != n {
        return Err(NotationError::RowCount {
            expected: n,
            found: rows.len(),
        });
    }

    let mut rotation = RationalMatrix::zeros(n);
    let mut translation = Vec::with_capacity(n);
    for (row, expr) in rows.iter().enumerate() {
        let (coeffs, trans) = parse_expr(expr, n, opts)?;
        for (col, c) in coeffs.into_iter().enumerate() {
            rotation.set(row, col, c);
        }
        let t = Twelfths::from_f64(trans);
        translation.push(if opts.normalize { t.normalized() } else { t });
    }
    Ok((rotation, translation))
}

/// Parse a single coordinate expression like `-x+1/2`, `x-y` or `2x1+x4`
///
/// Returns the per-variable coefficients and the translation.
fn parse_expr(
    expr: &str,
    n: usize,
    opts: NotationOptions,
) -> Result<(Vec<Rational32>, f64), NotationError> {
    let mut coeffs = vec![Rational32::zero(); n];
    let mut trans = 0.0f64;

    let chars: Vec<char> = expr
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\'' | '{' | '}'))
        .collect();
    let len = chars.len();
    if len == 0 {
        return Err(NotationError::EmptyNotation);
    }
    let mut i = 0;

    while i < len {
        // Determine sign
        let sign = match chars[i] {
            '-' => {
                i += 1;
                -1
            }
            '+' => {
                i += 1;
                1
            }
            _ => 1,
        };

        if i >= len {
            return Err(NotationError::DanglingSign(expr.to_string()));
        }

        let mut scale: Option<f64> = None;
        if chars[i].is_ascii_digit() || chars[i] == '.' {
            let (value, consumed) = parse_number(&chars[i..])?;
            scale = Some(value);
            i += consumed;
            if i < len && chars[i] == '*' {
                i += 1;
            }
        }

        if i < len && chars[i].is_ascii_alphabetic() {
            let (var, consumed) = parse_variable(&chars[i..], n)?;
            i += consumed;
            let magnitude = match scale {
                Some(value) => to_twelfths(value, opts.allow_scaling)?,
                None => Rational32::one(),
            };
            let coefficient = magnitude * Rational32::from_integer(sign);
            check_coefficient(coefficient, opts.allow_scaling)?;
            coeffs[var] += coefficient;
        } else if let Some(value) = scale {
            trans += sign as f64 * value;
        } else {
            return Err(NotationError::UnexpectedChar {
                ch: chars[i],
                pos: i,
            });
        }
    }

    Ok((coeffs, trans))
}

/// Parse `12`, `0.5`, `1/3` or `.25` from a character slice.
/// Returns (value, chars consumed).
fn parse_number(chars: &[char]) -> Result<(f64, usize), NotationError> {
    let mut i = 0;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    let head: String = chars[..i].iter().collect();
    let numerator: f64 = head
        .parse()
        .map_err(|_| NotationError::InvalidNumber(head.clone()))?;

    // Check for fraction
    let mut value = numerator;
    if i < chars.len() && chars[i] == '/' {
        let start = i + 1;
        let mut j = start;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        let tail: String = chars[start..j].iter().collect();
        let denominator: f64 = tail
            .parse()
            .map_err(|_| NotationError::InvalidNumber(format!("{head}/{tail}")))?;
        if denominator == 0.0 {
            return Err(NotationError::InvalidNumber(format!("{head}/{tail}")));
        }
        value = numerator / denominator;
        i = j;
    }
    Ok((value, i))
}

/// Exact coefficient in twelfths.
///
/// Values off the twelfths grid are rejected unless scaling is allowed,
/// in which case they snap to the nearest twelfth.
fn to_twelfths(value: f64, allow_scaling: bool) -> Result<Rational32, NotationError> {
    let scaled = value * 12.0;
    let rounded = scaled.round();
    if !allow_scaling && (rounded - scaled).abs() > 1e-3 {
        return Err(NotationError::NonCrystallographic(value.to_string()));
    }
    let twelfths = i32::try_from(rounded as i64)
        .map_err(|_| NotationError::InvalidNumber(value.to_string()))?;
    Ok(Rational32::new(twelfths, 12))
}

/// Parse `x`, `y`, `z` or an indexed `x1`..`x13` into a column index
fn parse_variable(chars: &[char], n: usize) -> Result<(usize, usize), NotationError> {
    let c = chars[0];
    let mut i = 1;
    let index = match c {
        'x' if i < chars.len() && chars[i].is_ascii_digit() => {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = chars[start..i].iter().collect();
            let k: usize = digits
                .parse()
                .map_err(|_| NotationError::UnknownVariable(format!("x{digits}")))?;
            if k == 0 {
                return Err(NotationError::UnknownVariable(format!("x{digits}")));
            }
            k - 1
        }
        'x' => 0,
        'y' => 1,
        'z' => 2,
        _ => {
            let name: String = chars
                .iter()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            return Err(NotationError::UnknownVariable(name));
        }
    };
    if index >= n {
        let name: String = chars[..i].iter().collect();
        return Err(NotationError::UnknownVariable(name));
    }
    Ok((index, i))
}

fn check_coefficient(c: Rational32, allow_scaling: bool) -> Result<(), NotationError> {
    if allow_scaling || c.abs() <= Rational32::one() {
        Ok(())
    } else {
        Err(NotationError::NonCrystallographic(c.to_string()))
    }
}

fn parse_matrix_values(
    text: &str,
    opts: NotationOptions,
) -> Result<(RationalMatrix, Vec<Twelfths>), NotationError> {
    let n = opts.dim();
    let values = text
        .split_whitespace()
        .filter(|t| *t != "bio")
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| NotationError::InvalidNumber(t.to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    let expected = (n + 1) * (n + 1);
    if values.len() != expected {
        return Err(NotationError::MatrixSize {
            expected,
            found: values.len(),
        });
    }

    let mut rotation = RationalMatrix::zeros(n);
    let mut translation = Vec::with_capacity(n);
    for row in 0..n {
        for col in 0..n {
            let c = to_twelfths(values[row * (n + 1) + col], false)?;
            check_coefficient(c, opts.allow_scaling)?;
            rotation.set(row, col, c);
        }
        let t = Twelfths::from_f64(values[row * (n + 1) + n]);
        translation.push(if opts.normalize { t.normalized() } else { t });
    }
    Ok((rotation, translation))
}

/// Variable labels for an operation of dimension `dim`
pub fn labels(dim: usize) -> Vec<String> {
    if dim == 3 {
        vec!["x".into(), "y".into(), "z".into()]
    } else {
        (1..=dim).map(|k| format!("x{k}")).collect()
    }
}

/// Regenerate Jones-Faithful notation from an exact affine matrix
pub fn format_notation(rotation: &RationalMatrix, translation: &[Twelfths]) -> String {
    let labels = labels(rotation.dim());
    let mut rows = Vec::with_capacity(rotation.dim());
    for (row, t) in translation.iter().enumerate().take(rotation.dim()) {
        let mut term = String::new();
        for (col, c) in rotation.row(row).iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            if c.is_negative() {
                term.push('-');
            } else if !term.is_empty() {
                term.push('+');
            }
            let magnitude = c.abs();
            if !magnitude.is_one() {
                term.push_str(&magnitude.to_string());
            }
            term.push_str(&labels[col]);
        }
        if !t.is_zero() {
            if t.0 > 0 && !term.is_empty() {
                term.push('+');
            }
            term.push_str(&t.to_string());
        }
        if term.is_empty() {
            term.push('0');
        }
        rows.push(term);
    }
    rows.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ParsedNotation {
        parse_notation(s, NotationOptions::default()).unwrap()
    }

    fn r(n: i32) -> Rational32 {
        Rational32::from_integer(n)
    }

    #[test]
    fn test_parse_identity() {
        let p = parse("x,y,z");
        assert!(p.rotation.is_identity());
        assert!(p.translation.iter().all(|t| t.is_zero()));
        assert!(!p.inverse);
    }

    #[test]
    fn test_parse_negative_with_translation() {
        let p = parse("-x+1/2,-y+1/2,z");
        assert_eq!(p.rotation.get(0, 0), r(-1));
        assert_eq!(p.rotation.get(1, 1), r(-1));
        assert_eq!(p.rotation.get(2, 2), r(1));
        assert_eq!(p.translation, vec![Twelfths(6), Twelfths(6), Twelfths(0)]);
    }

    #[test]
    fn test_parse_leading_fraction_and_spaces() {
        let p = parse(" 1/2+X , Y - X , -Z ");
        assert_eq!(p.rotation.get(0, 0), r(1));
        assert_eq!(p.rotation.get(1, 0), r(-1));
        assert_eq!(p.rotation.get(1, 1), r(1));
        assert_eq!(p.rotation.get(2, 2), r(-1));
        assert_eq!(p.translation[0], Twelfths(6));
    }

    #[test]
    fn test_parse_decimal_and_thirds() {
        let p = parse("x+0.5,y+2/3,z+0.3333");
        assert_eq!(p.translation, vec![Twelfths(6), Twelfths(-4), Twelfths(4)]);
    }

    #[test]
    fn test_normalization_can_be_disabled() {
        let opts = NotationOptions {
            normalize: false,
            ..NotationOptions::default()
        };
        let p = parse_notation("x+3/4,y+1,z-1/2", opts).unwrap();
        assert_eq!(p.translation, vec![Twelfths(9), Twelfths(12), Twelfths(-6)]);
        let p = parse("x+3/4,y+1,z-1/2");
        assert_eq!(p.translation, vec![Twelfths(-3), Twelfths(0), Twelfths(6)]);
    }

    #[test]
    fn test_inverse_prefix() {
        let p = parse("!-y,x-y,z+1/3");
        assert!(p.inverse);
        assert_eq!(p.rotation.get(0, 1), r(-1));
    }

    #[test]
    fn test_superspace_labels() {
        let opts = NotationOptions {
            modulation_dim: 1,
            ..NotationOptions::default()
        };
        let p = parse_notation("x1,-x2,x3+1/2,-x4+1/2", opts).unwrap();
        assert_eq!(p.rotation.dim(), 4);
        assert_eq!(p.rotation.get(3, 3), r(-1));
        assert_eq!(p.translation[2], Twelfths(6));
        assert_eq!(format_notation(&p.rotation, &p.translation), "x1,-x2,x3+1/2,-x4+1/2");
    }

    #[test]
    fn test_matrix_literals() {
        let p = parse("[[1,0,0,0],[0,-1,0,0.5],[0,0,1,0],[0,0,0,1]]");
        assert_eq!(p.rotation.get(1, 1), r(-1));
        assert_eq!(p.translation[1], Twelfths(6));

        let q = parse("xyz matrix: 1 0 0 0 0 -1 0 0.5 0 0 1 0 0 0 0 1");
        assert_eq!(p, q);
    }

    #[test]
    fn test_scaling() {
        assert!(matches!(
            parse_notation("2x,y,z", NotationOptions::default()),
            Err(NotationError::NonCrystallographic(_))
        ));
        let opts = NotationOptions {
            allow_scaling: true,
            normalize: false,
            ..NotationOptions::default()
        };
        let p = parse_notation("2x,x+y,3z", opts).unwrap();
        assert_eq!(p.rotation.get(0, 0), r(2));
        assert_eq!(p.rotation.get(1, 0), r(1));
        assert_eq!(p.rotation.get(2, 2), r(3));
    }

    #[test]
    fn test_off_grid_coefficient_rejected() {
        let opts = NotationOptions::default();
        assert!(matches!(
            parse_notation("0.3x,y,z", opts),
            Err(NotationError::NonCrystallographic(_))
        ));
        assert!(matches!(
            parse_notation("[[0.3,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]]", opts),
            Err(NotationError::NonCrystallographic(_))
        ));
        let p = parse("0.5x,y,z");
        assert_eq!(p.rotation.get(0, 0), Rational32::new(1, 2));
        assert_eq!(p.rotation.get(1, 1), r(1));
    }

    #[test]
    fn test_malformed() {
        let opts = NotationOptions::default();
        assert!(matches!(parse_notation("", opts), Err(NotationError::EmptyNotation)));
        assert!(matches!(
            parse_notation("x,y", opts),
            Err(NotationError::RowCount { expected: 3, found: 2 })
        ));
        assert!(matches!(
            parse_notation("x,y,w", opts),
            Err(NotationError::UnknownVariable(_))
        ));
        assert!(matches!(
            parse_notation("x,y,z+", opts),
            Err(NotationError::DanglingSign(_))
        ));
        assert!(matches!(
            parse_notation("x,y,z+1/0", opts),
            Err(NotationError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_notation("x,y,z;", opts),
            Err(NotationError::UnexpectedChar { ch: ';', .. })
        ));
        assert!(matches!(
            parse_notation("x,y,x4", opts),
            Err(NotationError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_format_roundtrip() {
        for s in ["x,y,z", "-x,-y,z+1/2", "-y,x-y,z+1/3", "y+1/4,x+3/4,-z+1/4", "x-y,-y,-z+1/2"] {
            let p = parse(s);
            let text = format_notation(&p.rotation, &p.translation);
            let q = parse(&text);
            assert_eq!(p, q, "roundtrip of {s} via {text}");
        }
        let p = parse("-x,-y,z+1/2");
        assert_eq!(format_notation(&p.rotation, &p.translation), "-x,-y,z+1/2");
    }
}
