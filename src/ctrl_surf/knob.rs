//! Knob position <-> parameter value.

use crate::{
    midi,
    model::{ParamKind, Parameter},
};

fn to_u7(normalized: f64) -> u8 {
    midi::normalized_f64::to_u7(normalized.clamp(0f64, 1f64)).unwrap_or_default()
}

/// Position of the knob (LED ring) displaying `param`.
pub fn to_device(param: &Parameter) -> u8 {
    match param.kind {
        ParamKind::Discrete {
            value,
            min,
            max,
            wrappable: true,
        } if max >= min => {
            // Half a step inset, so that the wrap point doesn't snap.
            let range = (max - min + 1) as f64;
            to_u7(((value - min) as f64 + 0.5) / range)
        }
        _ => to_u7(param.normalized()),
    }
}

/// Normalized value to apply to `param` for a knob at position `value`.
pub fn from_device(value: u8, param: &Parameter) -> f64 {
    let normalized = match midi::normalized_f64::from_u7(value) {
        Ok(normalized) => normalized,
        Err(err) => {
            log::warn!("Knob value: {err}");
            return param.normalized();
        }
    };

    match param.kind {
        ParamKind::Discrete {
            wrappable: true, ..
        } => {
            // Keep on wrapping in the turning direction.
            if normalized == 0f64 {
                1f64
            } else if normalized == 1f64 {
                0f64
            } else {
                normalized
            }
        }
        _ => normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamId;

    fn param(kind: ParamKind) -> Parameter {
        Parameter {
            id: ParamId(1),
            label: "test".into(),
            kind,
        }
    }

    #[test]
    fn continuous() {
        let level = param(ParamKind::Continuous { value: 0.5 });
        assert_eq!(to_device(&level), 64);
        assert_eq!(from_device(127, &level), 1.0);
        assert_eq!(from_device(0, &level), 0.0);
    }

    #[test]
    fn wrappable_is_inset() {
        let hue = param(ParamKind::Discrete {
            value: 0,
            min: 0,
            max: 3,
            wrappable: true,
        });
        // (0 + 0.5) / 4 * 127
        assert_eq!(to_device(&hue), 16);

        let hue = param(ParamKind::Discrete {
            value: 3,
            min: 0,
            max: 3,
            wrappable: true,
        });
        // (3 + 0.5) / 4 * 127
        assert_eq!(to_device(&hue), 111);

        let steps = param(ParamKind::Discrete {
            value: 3,
            min: 0,
            max: 3,
            wrappable: false,
        });
        assert_eq!(to_device(&steps), 127);
    }

    #[test]
    fn wrappable_extremes_are_swapped() {
        let mut hue = param(ParamKind::Discrete {
            value: 3,
            min: 0,
            max: 3,
            wrappable: true,
        });
        assert_eq!(hue.normalized(), 1.0);

        let normalized = from_device(127, &hue);
        assert_eq!(normalized, 0.0);
        hue.set_normalized(normalized);
        assert!(matches!(hue.kind, ParamKind::Discrete { value: 0, .. }));

        assert_eq!(from_device(0, &hue), 1.0);
        assert!((from_device(64, &hue) - 64.0 / 127.0).abs() < f64::EPSILON);

        let steps = param(ParamKind::Discrete {
            value: 3,
            min: 0,
            max: 3,
            wrappable: false,
        });
        assert_eq!(from_device(127, &steps), 1.0);
    }
}
