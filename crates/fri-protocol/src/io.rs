//! IO 信号
//!
//! 控制器在项目配置中声明的布尔/数字/模拟 IO，按名字访问。

use smallvec::SmallVec;

/// IO 信号取值
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IoValue {
    Boolean(bool),
    Digital(u64),
    Analog(f64),
}

impl IoValue {
    /// 类型名（用于错误信息）
    pub fn kind_name(&self) -> &'static str {
        match self {
            IoValue::Boolean(_) => "boolean",
            IoValue::Digital(_) => "digital",
            IoValue::Analog(_) => "analog",
        }
    }

    /// 线上类型标记
    pub(crate) fn wire_kind(&self) -> u8 {
        match self {
            IoValue::Boolean(_) => 0,
            IoValue::Digital(_) => 1,
            IoValue::Analog(_) => 2,
        }
    }

    pub(crate) fn same_kind(&self, other: &IoValue) -> bool {
        self.wire_kind() == other.wire_kind()
    }
}

/// 单个命名 IO 信号
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IoSignal {
    pub name: String,
    pub value: IoValue,
}

impl IoSignal {
    pub fn new(name: impl Into<String>, value: IoValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// IO 信号集合
///
/// 典型项目只配置少量信号，内联存储避免每周期分配。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoSignals {
    signals: SmallVec<[IoSignal; 4]>,
}

impl IoSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IoSignal> {
        self.signals.iter()
    }

    pub fn get(&self, name: &str) -> Option<&IoValue> {
        self.signals.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    /// 写入（已存在则覆盖）
    pub fn set(&mut self, name: &str, value: IoValue) {
        match self.signals.iter_mut().find(|s| s.name == name) {
            Some(signal) => signal.value = value,
            None => self.signals.push(IoSignal::new(name, value)),
        }
    }

    pub fn clear(&mut self) {
        self.signals.clear();
    }
}

impl FromIterator<IoSignal> for IoSignals {
    fn from_iter<I: IntoIterator<Item = IoSignal>>(iter: I) -> Self {
        let mut signals = IoSignals::new();
        for signal in iter {
            signals.set(&signal.name, signal.value);
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_existing() {
        let mut io = IoSignals::new();
        io.set("gripper", IoValue::Boolean(false));
        io.set("gripper", IoValue::Boolean(true));
        assert_eq!(io.len(), 1);
        assert_eq!(io.get("gripper"), Some(&IoValue::Boolean(true)));
        assert_eq!(io.get("missing"), None);
    }

    #[test]
    fn test_from_iter_and_kinds() {
        let io: IoSignals = [
            IoSignal::new("enable", IoValue::Boolean(true)),
            IoSignal::new("counter", IoValue::Digital(42)),
            IoSignal::new("voltage", IoValue::Analog(0.5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(io.len(), 3);
        assert_eq!(io.get("counter").map(|v| v.kind_name()), Some("digital"));
        assert!(IoValue::Analog(1.0).same_kind(&IoValue::Analog(-1.0)));
        assert!(!IoValue::Analog(1.0).same_kind(&IoValue::Digital(1)));
    }
}
