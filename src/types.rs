use std::rc::Rc;

/// Handle into the object arena owned by a [`crate::runtime::Context`].
///
/// Handles are plain indices: holding one does not keep the object alive
/// across [`crate::runtime::Context::collect_garbage`] unless it is pinned or
/// reachable from a root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Also serves as AVM1's "no value".
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectId),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

pub mod number_ops {
    /// Significant decimal digits kept when printing a number.
    pub const PRINT_PRECISION: usize = 15;

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let (digits, exponent) = rounded_digits(x.abs());
        let body = layout_digits(&digits, exponent);
        if x < 0.0 { format!("-{body}") } else { body }
    }

    // Any double whose shortest round-trip form fits in PRINT_PRECISION
    // digits already is its own rounding; longer ones are re-rounded from the
    // exact binary value.
    fn rounded_digits(x: f64) -> (String, i32) {
        let mut buf = ryu_js::Buffer::new();
        let (digits, exponent) = decompose(buf.format_finite(x));
        if digits.len() <= PRINT_PRECISION {
            return (digits, exponent);
        }
        let exact = format!("{:.*e}", PRINT_PRECISION - 1, x);
        decompose(&exact)
    }

    /// Splits a decimal literal into its significant digits (no leading or
    /// trailing zeros) and the power of ten of the first digit.
    fn decompose(literal: &str) -> (String, i32) {
        let (mantissa, exp_part) = match literal.find(['e', 'E']) {
            Some(pos) => (&literal[..pos], literal[pos + 1..].parse::<i32>().unwrap_or(0)),
            None => (literal, 0),
        };
        let int_len = mantissa.find('.').unwrap_or(mantissa.len()) as i32;
        let all: String = mantissa.chars().filter(char::is_ascii_digit).collect();
        let leading = all.chars().take_while(|&c| c == '0').count();
        let digits = all[leading..].trim_end_matches('0').to_string();
        if digits.is_empty() {
            return ("0".to_string(), 0);
        }
        (digits, int_len - 1 - leading as i32 + exp_part)
    }

    fn layout_digits(digits: &str, exponent: i32) -> String {
        if !(-5..15).contains(&exponent) {
            let sign = if exponent >= 0 { "+" } else { "-" };
            let (head, tail) = digits.split_at(1);
            return if tail.is_empty() {
                format!("{head}e{sign}{}", exponent.abs())
            } else {
                format!("{head}.{tail}e{sign}{}", exponent.abs())
            };
        }
        if exponent < 0 {
            return format!("0.{}{digits}", "0".repeat((-exponent - 1) as usize));
        }
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            format!("{digits}{}", "0".repeat(int_len - digits.len()))
        } else {
            format!("{}.{}", &digits[..int_len], &digits[int_len..])
        }
    }

    pub fn to_int32(x: f64) -> i32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        let wrapped = x.trunc() % 4_294_967_296.0;
        (wrapped as i64 as u32) as i32
    }

    pub fn to_uint32(x: f64) -> u32 {
        to_int32(x) as u32
    }

    /// Truncates toward zero; NaN becomes 0 and infinities pass through.
    pub fn to_integer(x: f64) -> f64 {
        if x.is_nan() {
            0.0
        } else if x.is_infinite() {
            x
        } else {
            x.trunc()
        }
    }

    pub fn format_radix(n: f64, radix: u32) -> String {
        if radix == 10 || !(2..=36).contains(&radix) {
            return to_string(n);
        }
        if !n.is_finite() {
            return to_string(n);
        }
        let negative = n < 0.0;
        let x = n.abs();
        let mut int_part = x.trunc();
        let mut frac = x - int_part;

        let mut digits = Vec::new();
        if int_part == 0.0 {
            digits.push('0');
        }
        while int_part >= 1.0 {
            let d = (int_part % radix as f64) as u32;
            digits.push(char::from_digit(d, radix).unwrap_or('0'));
            int_part = (int_part / radix as f64).trunc();
        }
        digits.reverse();
        let mut result: String = digits.into_iter().collect();

        if frac != 0.0 {
            result.push('.');
            // bounded: binary fractions may not terminate in the target radix
            for _ in 0..20 {
                frac *= radix as f64;
                let digit = frac.trunc() as u32;
                result.push(char::from_digit(digit, radix).unwrap_or('0'));
                frac -= digit as f64;
                if frac < 1e-10 {
                    break;
                }
            }
        }

        if negative { format!("-{result}") } else { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn decimal_rounding_hides_binary_artifacts() {
        assert_eq!(number_ops::to_string(0.1 + 0.2), "0.3");
        assert_eq!(number_ops::to_string(1.0 - 0.9), "0.1");
        assert_eq!(number_ops::to_string(1.1 * 3.0), "3.3");
        assert_eq!(number_ops::to_string(-0.7 - 0.1), "-0.8");
    }

    #[test]
    fn plain_numbers() {
        assert_eq!(number_ops::to_string(42.0), "42");
        assert_eq!(number_ops::to_string(-3.5), "-3.5");
        assert_eq!(number_ops::to_string(123456789012345.0), "123456789012345");
        assert_eq!(number_ops::to_string(0.00001), "0.00001");
    }

    #[test]
    fn exponent_forms() {
        assert_eq!(number_ops::to_string(1e15), "1e+15");
        assert_eq!(number_ops::to_string(1.5e21), "1.5e+21");
        assert_eq!(number_ops::to_string(0.000001), "1e-6");
        assert_eq!(number_ops::to_string(-2.5e-7), "-2.5e-7");
    }

    #[test]
    fn to_int32_wraps() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(f64::INFINITY), 0);
        assert_eq!(number_ops::to_int32(42.9), 42);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(2147483648.0), -2147483648);
        assert_eq!(number_ops::to_int32(4294967297.0), 1);
        assert_eq!(number_ops::to_uint32(-1.0), 4294967295);
    }

    #[test]
    fn to_integer_truncates() {
        assert_eq!(number_ops::to_integer(f64::NAN), 0.0);
        assert_eq!(number_ops::to_integer(-7.9), -7.0);
        assert_eq!(number_ops::to_integer(f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn radix_formatting() {
        assert_eq!(number_ops::format_radix(255.0, 16), "ff");
        assert_eq!(number_ops::format_radix(-5.0, 2), "-101");
        assert_eq!(number_ops::format_radix(0.5, 2), "0.1");
        assert_eq!(number_ops::format_radix(10.0, 10), "10");
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Undefined.is_nullish());
        assert!(Value::Null.is_nullish());
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from(3).as_number(), Some(3.0));
        assert_eq!(Value::Object(ObjectId(4)).as_object(), Some(ObjectId(4)));
        assert_eq!(Value::Bool(true).type_name(), "boolean");
    }
}
