use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};

use super::*;

/// Largest distance from the epoch a date may hold, in milliseconds.
const MAX_TIME: f64 = 8.64e15;

fn time_clip(time: f64) -> f64 {
    if !time.is_finite() || time.abs() > MAX_TIME {
        return f64::NAN;
    }
    time.trunc() + 0.0
}

fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// Milliseconds for local-time components; month is zero based and may
/// overflow into the year, like the other fields.
fn local_time_value(parts: &[f64]) -> f64 {
    if parts.iter().any(|p| !p.is_finite()) {
        return f64::NAN;
    }
    let field = |i: usize, default: f64| parts.get(i).copied().map_or(default, f64::trunc);
    let mut year = field(0, f64::NAN);
    if (0.0..100.0).contains(&year) {
        year += 1900.0;
    }
    let months = year * 12.0 + field(1, 0.0);
    let (y, m) = (months.div_euclid(12.0), months.rem_euclid(12.0));
    if y.abs() > 300_000.0 {
        return f64::NAN;
    }
    let Some(first) = NaiveDate::from_ymd_opt(y as i32, m as u32 + 1, 1) else {
        return f64::NAN;
    };
    let offset_ms = (((field(2, 1.0) - 1.0) * 24.0 + field(3, 0.0)) * 60.0 + field(4, 0.0)) * 60_000.0
        + field(5, 0.0) * 1000.0
        + field(6, 0.0);
    let Some(delta) = TimeDelta::try_milliseconds(offset_ms as i64) else {
        return f64::NAN;
    };
    let Some(naive) = first.and_hms_opt(0, 0, 0).and_then(|midnight| midnight.checked_add_signed(delta)) else {
        return f64::NAN;
    };
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => time_clip(local.timestamp_millis() as f64),
        None => f64::NAN,
    }
}

fn format_date(ms: f64) -> String {
    if ms.is_nan() {
        return "Invalid Date".to_string();
    }
    match DateTime::<Utc>::from_timestamp_millis(ms as i64) {
        Some(utc) => utc.with_timezone(&Local).format("%a %b %-d %H:%M:%S GMT%z %Y").to_string(),
        None => "Invalid Date".to_string(),
    }
}

fn this_time(cx: &Context, this: &Value) -> f64 {
    match this.as_object().and_then(|obj| cx.data(obj)).map(|d| &d.kind) {
        Some(ObjectKind::Date(ms)) => *ms,
        _ => f64::NAN,
    }
}

impl Context {
    pub fn create_date(&mut self, ms: f64) -> ObjectId {
        let proto = self.builtins.date_prototype;
        self.create_object_of_kind(Some(proto), ObjectKind::Date(time_clip(ms)))
    }

    pub(super) fn setup_date(&mut self) {
        let proto = self.create_object();
        self.builtins.date_prototype = proto;

        let call = native_fn(|_, _, _| Ok(Value::string(&format_date(now_ms()))));
        let construct = native_fn(|cx, this, args| {
            let ms = match args {
                [] => now_ms(),
                [single] => coerce::to_number(cx, single)?,
                _ => {
                    let mut parts = Vec::with_capacity(args.len());
                    for a in args.iter().take(7) {
                        parts.push(coerce::to_number(cx, a)?);
                    }
                    local_time_value(&parts)
                }
            };
            let date = cx.create_date(ms);
            let fallback = cx.builtins().date_prototype;
            let proto = instance_prototype(cx, this, fallback)?;
            cx.set_prototype(date, Some(proto));
            Ok(Value::Object(date))
        });
        self.builtins.date = self.define_class("Date", call, construct, proto);

        self.define_method(proto, "getTime", |cx, this, _| Ok(Value::Number(this_time(cx, this))));
        self.define_method(proto, "valueOf", |cx, this, _| Ok(Value::Number(this_time(cx, this))));
        self.define_method(proto, "toString", |cx, this, _| Ok(Value::string(&format_date(this_time(cx, this)))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_bounds() {
        assert_eq!(time_clip(1.9), 1.0);
        assert!(time_clip(9e15).is_nan());
        assert!(time_clip(f64::NAN).is_nan());
    }

    #[test]
    fn construct_from_milliseconds() {
        let mut cx = Context::with_swf_version(8);
        let date = cx.builtins().date;
        let d = cx.construct(date, &[Value::Number(86_400_000.0)]).unwrap();
        assert_eq!(coerce::to_number(&mut cx, &d).unwrap(), 86_400_000.0);
        let obj = d.as_object().unwrap();
        let get_time = cx.get(obj, "getTime").unwrap();
        assert_eq!(cx.call_value(&get_time, &d, &[]).unwrap(), Value::Number(86_400_000.0));
        let text = coerce::to_string(&mut cx, &d).unwrap();
        assert!(text.contains("GMT"), "{text}");
        assert!(text.ends_with("1970"), "{text}");
    }

    #[test]
    fn construct_from_components_round_trips() {
        let a = local_time_value(&[2005.0, 1.0, 1.0]);
        let b = local_time_value(&[2004.0, 13.0, 1.0]);
        assert_eq!(a, b);
        let c = local_time_value(&[2005.0, 1.0, 1.0, 12.0, 30.0]);
        assert_eq!(c - a, 45_000_000.0);
        assert!(local_time_value(&[f64::NAN, 1.0]).is_nan());
        assert_eq!(local_time_value(&[99.0, 0.0]), local_time_value(&[1999.0, 0.0]));
    }

    #[test]
    fn current_time_by_default() {
        let mut cx = Context::with_swf_version(8);
        let before = now_ms();
        let date = cx.builtins().date;
        let d = cx.construct(date, &[]).unwrap();
        let t = coerce::to_number(&mut cx, &d).unwrap();
        assert!(t >= before);
        assert!(format_date(f64::NAN) == "Invalid Date");
    }
}
