use crate::entity::{PropertyValue, Reference};
use serde::{Deserialize, Serialize};
use std::slice::{Iter, IterMut};

/// 单个属性的变更，包含旧值与新值（`None` 表示无值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    name: String,
    #[serde(default)]
    old_value: Option<PropertyValue>,
    #[serde(default)]
    new_value: Option<PropertyValue>,
}

impl PropertyChange {
    pub fn new(
        name: impl Into<String>,
        old_value: Option<PropertyValue>,
        new_value: Option<PropertyValue>,
    ) -> Self {
        Self {
            name: name.into(),
            old_value,
            new_value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn old_value(&self) -> Option<&PropertyValue> {
        self.old_value.as_ref()
    }

    pub fn new_value(&self) -> Option<&PropertyValue> {
        self.new_value.as_ref()
    }

    pub fn is_changed(&self) -> bool {
        self.old_value != self.new_value
    }

    pub fn for_each_ref<F: FnMut(&Reference)>(&self, f: &mut F) {
        if let Some(v) = self.old_value.as_ref() {
            v.for_each_ref(f);
        }
        if let Some(v) = self.new_value.as_ref() {
            v.for_each_ref(f);
        }
    }

    pub fn for_each_ref_mut<F: FnMut(&mut Reference)>(&mut self, f: &mut F) {
        if let Some(v) = self.old_value.as_mut() {
            v.for_each_ref_mut(f);
        }
        if let Some(v) = self.new_value.as_mut() {
            v.for_each_ref_mut(f);
        }
    }
}

/// 属性差量：按变更发生顺序排列
///
/// 同一属性多次变更时保留首次出现的位置与最初的旧值，新值取最后一次。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyDiff {
    changes: Vec<PropertyChange>,
}

impl PropertyDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        old_value: Option<PropertyValue>,
        new_value: Option<PropertyValue>,
    ) -> Self {
        self.push(PropertyChange::new(name, old_value, new_value));
        self
    }

    pub fn push(&mut self, change: PropertyChange) {
        match self.changes.iter_mut().find(|c| c.name == change.name) {
            Some(existing) => existing.new_value = change.new_value,
            None => self.changes.push(change),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyChange> {
        self.changes.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, PropertyChange> {
        self.changes.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, PropertyChange> {
        self.changes.iter_mut()
    }
}

impl FromIterator<PropertyChange> for PropertyDiff {
    fn from_iter<T: IntoIterator<Item = PropertyChange>>(iter: T) -> Self {
        let mut diff = PropertyDiff::new();
        for change in iter {
            diff.push(change);
        }
        diff
    }
}

impl<'a> IntoIterator for &'a PropertyDiff {
    type Item = &'a PropertyChange;
    type IntoIter = Iter<'a, PropertyChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
