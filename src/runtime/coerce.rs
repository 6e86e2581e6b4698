//! Value conversions shared by every object operation. Several rules depend on
//! the movie's SWF version, so each conversion takes the [`Context`].

use std::rc::Rc;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultValueHint {
    #[default]
    Number,
    String,
}

pub fn to_primitive(cx: &mut Context, value: &Value, hint: DefaultValueHint) -> Avm1Result<Value> {
    match value {
        Value::Object(obj) => cx.default_value(*obj, hint),
        other => Ok(other.clone()),
    }
}

pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
    }
}

pub fn to_number(cx: &mut Context, value: &Value) -> Avm1Result<f64> {
    let value = match value {
        Value::Object(_) => to_primitive(cx, value, DefaultValueHint::Number)?,
        other => other.clone(),
    };
    Ok(match value {
        Value::Undefined | Value::Null => {
            if cx.swf_version() >= 7 {
                f64::NAN
            } else {
                0.0
            }
        }
        Value::Bool(b) => b as u8 as f64,
        Value::Number(n) => n,
        Value::String(s) if s.is_empty() => {
            if cx.swf_version() < 5 {
                0.0
            } else {
                f64::NAN
            }
        }
        Value::String(s) => string_to_number(&s),
        // default_value handed back an object
        Value::Object(_) => f64::NAN,
    })
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if unsigned.starts_with(['+', '-']) {
        return f64::NAN;
    }
    let magnitude = if unsigned == "Infinity" {
        f64::INFINITY
    } else if let Some(hex) = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return f64::NAN;
        }
        hex.bytes().fold(0.0, |acc, b| acc * 16.0 + f64::from((b as char).to_digit(16).unwrap_or(0)))
    } else {
        // f64::from_str also takes "inf" and "nan", which are not numbers here
        if !unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        {
            return f64::NAN;
        }
        unsigned.parse::<f64>().unwrap_or(f64::NAN)
    };
    if negative { -magnitude } else { magnitude }
}

pub fn to_integer(cx: &mut Context, value: &Value) -> Avm1Result<f64> {
    Ok(number_ops::to_integer(to_number(cx, value)?))
}

pub fn to_int32(cx: &mut Context, value: &Value) -> Avm1Result<i32> {
    Ok(number_ops::to_int32(to_number(cx, value)?))
}

pub fn to_uint32(cx: &mut Context, value: &Value) -> Avm1Result<u32> {
    Ok(number_ops::to_uint32(to_number(cx, value)?))
}

pub fn to_string(cx: &mut Context, value: &Value) -> Avm1Result<Rc<str>> {
    let mut joining = Vec::new();
    to_string_inner(cx, value, &mut joining)
}

fn to_string_inner(cx: &mut Context, value: &Value, joining: &mut Vec<ObjectId>) -> Avm1Result<Rc<str>> {
    match value {
        Value::Undefined => Ok(Rc::from(if cx.swf_version() >= 7 { "undefined" } else { "" })),
        Value::Null => Ok(Rc::from("null")),
        Value::Bool(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
        Value::Number(n) => Ok(Rc::from(number_ops::to_string(*n))),
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) if cx.data(*obj).is_some_and(ObjectData::is_array) => {
            // a self-containing array renders the inner reference as empty
            if joining.contains(obj) {
                return Ok(Rc::from(""));
            }
            joining.push(*obj);
            let elements = cx.array_elements(*obj);
            let mut parts = Vec::new();
            let mut result = Ok(());
            match elements {
                Ok(elements) => {
                    for element in &elements {
                        match to_string_inner(cx, element, joining) {
                            Ok(s) => parts.push(s),
                            Err(e) => {
                                result = Err(e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => result = Err(e),
            }
            joining.pop();
            result?;
            Ok(Rc::from(parts.join(",")))
        }
        Value::Object(obj) => {
            let primitive = cx.default_value(*obj, DefaultValueHint::String)?;
            match primitive {
                Value::Object(inner) if cx.is_callable(&Value::Object(inner)) => Ok(Rc::from("[type Function]")),
                Value::Object(_) => Ok(Rc::from("[type Object]")),
                other => to_string_inner(cx, &other, joining),
            }
        }
    }
}

/// Boxes primitives into Boolean, Number or String wrappers.
pub fn to_object(cx: &mut Context, value: &Value) -> Avm1Result<ObjectId> {
    let builtins = cx.builtins().clone();
    match value {
        Value::Object(obj) => Ok(*obj),
        Value::Undefined | Value::Null => Err(Avm1Error::type_error(format!(
            "cannot convert {} to an object",
            value.type_name()
        ))),
        Value::Bool(b) => Ok(cx.create_object_of_kind(Some(builtins.boolean_prototype), ObjectKind::Boolean(*b))),
        Value::Number(n) => Ok(cx.create_object_of_kind(Some(builtins.number_prototype), ObjectKind::Number(*n))),
        Value::String(s) => {
            let boxed = cx.create_object_of_kind(Some(builtins.string_prototype), ObjectKind::String(s.clone()));
            let length = s.encode_utf16().count() as f64;
            cx.set_own_property(
                boxed,
                "length",
                PropertyDescriptor::data(
                    Value::Number(length),
                    PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE | PropertyFlags::READ_ONLY,
                ),
            );
            Ok(boxed)
        }
    }
}

/// Whether `value` can be used as a property name without normalization.
pub fn is_name(cx: &mut Context, value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => cx.is_case_sensitive() || *cx.normalize_name(s) == **s,
        _ => false,
    }
}
