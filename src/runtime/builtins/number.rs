use super::*;

fn this_number(cx: &mut Context, this: &Value) -> Avm1Result<f64> {
    if let Value::Object(obj) = this
        && let Some(ObjectKind::Number(n)) = cx.data(*obj).map(|d| &d.kind)
    {
        return Ok(*n);
    }
    match this {
        Value::Object(_) => Ok(f64::NAN),
        other => coerce::to_number(cx, other),
    }
}

fn this_boolean(cx: &Context, this: &Value) -> bool {
    if let Value::Object(obj) = this
        && let Some(ObjectKind::Boolean(b)) = cx.data(*obj).map(|d| &d.kind)
    {
        return *b;
    }
    coerce::to_boolean(this)
}

/// Boxes `value` with the prototype of the constructor in `this`.
fn box_primitive(cx: &mut Context, this: &Value, value: Value) -> Avm1Result<Value> {
    let boxed = coerce::to_object(cx, &value)?;
    let fallback = cx.prototype_of(boxed).unwrap_or(cx.builtins().object_prototype);
    let proto = instance_prototype(cx, this, fallback)?;
    cx.set_prototype(boxed, Some(proto));
    Ok(Value::Object(boxed))
}

impl Context {
    pub(super) fn setup_number(&mut self) {
        let proto = self.create_object();
        self.builtins.number_prototype = proto;

        let call = native_fn(|cx, _, args| match args.first() {
            None => Ok(Value::Number(0.0)),
            Some(v) => Ok(Value::Number(coerce::to_number(cx, v)?)),
        });
        let construct = native_fn(|cx, this, args| {
            let n = match args.first() {
                None => 0.0,
                Some(v) => coerce::to_number(cx, v)?,
            };
            box_primitive(cx, this, Value::Number(n))
        });
        let number = self.define_class("Number", call, construct, proto);
        self.builtins.number = number;

        for (name, value) in [
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("NaN", f64::NAN),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ] {
            self.define_constant(number, name, Value::Number(value));
        }

        self.define_method(proto, "toString", |cx, this, args| {
            let n = this_number(cx, this)?;
            let radix = match args.first() {
                None | Some(Value::Undefined) => 10,
                Some(r) => coerce::to_int32(cx, r)?,
            };
            let text = match u32::try_from(radix) {
                Ok(radix) if (2..=36).contains(&radix) => number_ops::format_radix(n, radix),
                _ => number_ops::to_string(n),
            };
            Ok(Value::string(&text))
        });
        self.define_method(proto, "valueOf", |cx, this, _| Ok(Value::Number(this_number(cx, this)?)));
    }

    pub(super) fn setup_boolean(&mut self) {
        let proto = self.create_object();
        self.builtins.boolean_prototype = proto;

        let call = native_fn(|_, _, args| Ok(Value::Bool(args.first().is_some_and(coerce::to_boolean))));
        let construct = native_fn(|cx, this, args| {
            let b = args.first().is_some_and(coerce::to_boolean);
            box_primitive(cx, this, Value::Bool(b))
        });
        self.builtins.boolean = self.define_class("Boolean", call, construct, proto);

        self.define_method(proto, "toString", |cx, this, _| {
            Ok(Value::string(if this_boolean(cx, this) { "true" } else { "false" }))
        });
        self.define_method(proto, "valueOf", |cx, this, _| Ok(Value::Bool(this_boolean(cx, this))));
    }

    pub(super) fn setup_math(&mut self) {
        let math = self.create_object();
        self.builtins.math = math;
        let global = self.global_object();
        self.set_own_property(global, "Math", PropertyDescriptor::data(Value::Object(math), PropertyFlags::DONT_ENUM));

        self.define_constant(math, "PI", Value::Number(std::f64::consts::PI));
        self.define_constant(math, "E", Value::Number(std::f64::consts::E));

        let unary: [(&str, fn(f64) -> f64); 5] = [
            ("abs", f64::abs),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
            ("sqrt", f64::sqrt),
            ("round", |x: f64| (x + 0.5).floor()),
        ];
        for (name, op) in unary {
            self.define_method(math, name, move |cx, _, args| {
                let x = coerce::to_number(cx, &arg(args, 0))?;
                Ok(Value::Number(op(x)))
            });
        }
        self.define_method(math, "max", |cx, _, args| {
            let mut result = f64::NEG_INFINITY;
            for a in args {
                let n = coerce::to_number(cx, a)?;
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                result = result.max(n);
            }
            Ok(Value::Number(result))
        });
        self.define_method(math, "min", |cx, _, args| {
            let mut result = f64::INFINITY;
            for a in args {
                let n = coerce::to_number(cx, a)?;
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                result = result.min(n);
            }
            Ok(Value::Number(result))
        });
        self.define_method(math, "pow", |cx, _, args| {
            let base = coerce::to_number(cx, &arg(args, 0))?;
            let exp = coerce::to_number(cx, &arg(args, 1))?;
            Ok(Value::Number(base.powf(exp)))
        });
        self.define_method(math, "random", |cx, _, _| Ok(Value::Number(cx.next_random())));
    }
}
