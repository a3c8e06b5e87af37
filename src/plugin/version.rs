// ==========================================
// 制造执行系统 - 插件版本与依赖版本区间
// ==========================================
// 版本: major[.minor[.patch]]，缺省分量为 0
// 区间: "1.0" 表示 >= 1.0；"[1.0,2.0)"、"(1.0,2.0]"、"[1.0]"、"(,2.0)"；空串表示任意版本
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::plugin::error::{PluginError, PluginResult};

// ==========================================
// Version
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }
}

impl FromStr for Version {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PluginError::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ==========================================
// VersionOfDependency - 依赖版本区间
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOfDependency {
    min: Option<Version>,
    min_inclusive: bool,
    max: Option<Version>,
    max_inclusive: bool,
}

impl VersionOfDependency {
    /// 任意版本
    pub fn any() -> Self {
        Self {
            min: None,
            min_inclusive: true,
            max: None,
            max_inclusive: true,
        }
    }

    pub fn min(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    /// 版本是否落在区间内
    pub fn contains(&self, version: &Version) -> bool {
        let above_min = match &self.min {
            None => true,
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
        };
        let below_max = match &self.max {
            None => true,
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
        };
        above_min && below_max
    }
}

impl FromStr for VersionOfDependency {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PluginError::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::any());
        }

        let opening = trimmed.chars().next().ok_or_else(invalid)?;
        if opening != '[' && opening != '(' {
            return Ok(Self {
                min: Some(trimmed.parse()?),
                min_inclusive: true,
                max: None,
                max_inclusive: true,
            });
        }

        let closing = trimmed.chars().last().ok_or_else(invalid)?;
        if trimmed.len() < 2 || (closing != ']' && closing != ')') {
            return Err(invalid());
        }
        let inner = &trimmed[1..trimmed.len() - 1];
        let min_inclusive = opening == '[';
        let max_inclusive = closing == ']';
        let bound = |part: &str| -> PluginResult<Option<Version>> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse().map(Some)
            }
        };

        match inner.split_once(',') {
            None => {
                // [1.0] 表示精确版本
                if !(min_inclusive && max_inclusive) {
                    return Err(invalid());
                }
                let exact = bound(inner)?.ok_or_else(invalid)?;
                Ok(Self {
                    min: Some(exact),
                    min_inclusive: true,
                    max: Some(exact),
                    max_inclusive: true,
                })
            }
            Some((low, high)) => {
                let min = bound(low)?;
                let max = bound(high)?;
                if let (Some(min), Some(max)) = (&min, &max) {
                    if min > max {
                        return Err(invalid());
                    }
                }
                Ok(Self {
                    min,
                    min_inclusive,
                    max,
                    max_inclusive,
                })
            }
        }
    }
}

impl fmt::Display for VersionOfDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "*"),
            (Some(min), None) if self.min_inclusive => write!(f, "{}", min),
            (Some(min), Some(max)) if min == max => write!(f, "[{}]", min),
            (min, max) => {
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(min) = min {
                    write!(f, "{}", min)?;
                }
                write!(f, ",")?;
                if let Some(max) = max {
                    write!(f, "{}", max)?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}
