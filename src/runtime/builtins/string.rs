use std::rc::Rc;

use super::*;

fn this_string(cx: &mut Context, this: &Value) -> Avm1Result<Rc<str>> {
    if let Value::Object(obj) = this
        && let Some(ObjectKind::String(s)) = cx.data(*obj).map(|d| &d.kind)
    {
        return Ok(s.clone());
    }
    coerce::to_string(cx, this)
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Index argument clamped into `0..=len`.
fn clamp_index(cx: &mut Context, value: &Value, len: usize) -> Avm1Result<usize> {
    let n = coerce::to_integer(cx, value)?;
    Ok(n.clamp(0.0, len as f64) as usize)
}

impl Context {
    pub(super) fn setup_string(&mut self) {
        let proto = self.create_object();
        self.builtins.string_prototype = proto;

        let call = native_fn(|cx, _, args| match args.first() {
            None => Ok(Value::string("")),
            Some(v) => Ok(Value::String(coerce::to_string(cx, v)?)),
        });
        let construct = native_fn(|cx, this, args| {
            let s = match args.first() {
                None => Rc::from(""),
                Some(v) => coerce::to_string(cx, v)?,
            };
            let boxed = coerce::to_object(cx, &Value::String(s))?;
            let fallback = cx.builtins().string_prototype;
            let proto = instance_prototype(cx, this, fallback)?;
            cx.set_prototype(boxed, Some(proto));
            Ok(Value::Object(boxed))
        });
        self.builtins.string = self.define_class("String", call, construct, proto);

        self.define_method(proto, "toString", |cx, this, _| Ok(Value::String(this_string(cx, this)?)));
        self.define_method(proto, "valueOf", |cx, this, _| Ok(Value::String(this_string(cx, this)?)));
        self.define_method(proto, "charAt", |cx, this, args| {
            let s = units(&this_string(cx, this)?);
            let index = coerce::to_integer(cx, &arg(args, 0))?;
            if index < 0.0 || index >= s.len() as f64 {
                return Ok(Value::string(""));
            }
            Ok(Value::string(&String::from_utf16_lossy(&s[index as usize..index as usize + 1])))
        });
        self.define_method(proto, "indexOf", |cx, this, args| {
            let s = units(&this_string(cx, this)?);
            let needle = units(&coerce::to_string(cx, &arg(args, 0))?);
            let start = clamp_index(cx, &arg(args, 1), s.len())?;
            let found = (start..=s.len().saturating_sub(needle.len()))
                .find(|&i| i + needle.len() <= s.len() && s[i..i + needle.len()] == needle[..]);
            Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
        });
        self.define_method(proto, "toUpperCase", |cx, this, _| {
            Ok(Value::string(&this_string(cx, this)?.to_uppercase()))
        });
        self.define_method(proto, "toLowerCase", |cx, this, _| {
            Ok(Value::string(&this_string(cx, this)?.to_lowercase()))
        });
        self.define_method(proto, "substr", |cx, this, args| {
            let s = units(&this_string(cx, this)?);
            let len = s.len();
            let mut start = coerce::to_integer(cx, &arg(args, 0))?;
            if start < 0.0 {
                start = (len as f64 + start).max(0.0);
            }
            let start = start.min(len as f64) as usize;
            let count = match args.get(1) {
                None | Some(Value::Undefined) => len - start,
                Some(n) => clamp_index(cx, n, len - start)?,
            };
            Ok(Value::string(&String::from_utf16_lossy(&s[start..start + count])))
        });
    }
}
