use serde::Serialize;

/// Binary-prefix unit of a quota magnitude (factor 1024 per step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Unit {
    None,
    K,
    M,
    G,
    T,
    P,
}

impl Unit {
    pub fn rank(&self) -> i32 {
        match self {
            Unit::None => 0,
            Unit::K    => 1,
            Unit::M    => 2,
            Unit::G    => 3,
            Unit::T    => 4,
            Unit::P    => 5,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::K    => "k",
            Unit::M    => "M",
            Unit::G    => "G",
            Unit::T    => "T",
            Unit::P    => "P",
        }
    }

    /// Next larger unit, `None` once `P` is reached.
    pub fn next(&self) -> Option<Unit> {
        match self {
            Unit::None => Some(Unit::K),
            Unit::K    => Some(Unit::M),
            Unit::M    => Some(Unit::G),
            Unit::G    => Some(Unit::T),
            Unit::T    => Some(Unit::P),
            Unit::P    => None,
        }
    }

    pub fn from_letter(c: char) -> Option<Unit> {
        match c {
            'k' | 'K' => Some(Unit::K),
            'M'       => Some(Unit::M),
            'G'       => Some(Unit::G),
            'T'       => Some(Unit::T),
            'P'       => Some(Unit::P),
            _         => None,
        }
    }
}

/// A non-negative magnitude with its unit, as reported by a quota tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledValue {
    pub magnitude: f64,
    pub unit:      Unit,
}

impl ScaledValue {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn raw(magnitude: f64) -> Self {
        Self::new(magnitude, Unit::None)
    }

    /// Magnitude expressed in unscaled units (bytes or plain counts).
    pub fn to_raw(&self) -> f64 {
        self.magnitude * 1024f64.powi(self.unit.rank())
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0.0
    }
}
