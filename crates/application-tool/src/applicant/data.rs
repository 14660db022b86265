use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definitions::{ArrayRef, Path, Scalar, ScalarType};

/// Typed value read from or written to the answer tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Long(i64),
    ListOfStrings(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicantDataError {
    #[error("cannot write to the empty path")]
    EmptyPath,
    #[error("path '{path}' has an unresolved array index before its last segment")]
    UnresolvedArrayIndex { path: String },
    #[error("path '{path}' crosses a value that is not an object or array")]
    ShapeConflict { path: String },
    #[error("path '{path}' has an array index too large to address")]
    IndexOutOfRange { path: String },
}

/// Per-applicant answer tree addressed by [`Path`].
///
/// Repeated entities and list scalars are JSON arrays; everything else is nested objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantData {
    root: Value,
}

impl Default for ApplicantData {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl ApplicantData {
    pub fn from_json(root: Value) -> Self {
        Self { root }
    }

    pub fn as_json(&self) -> &Value {
        &self.root
    }

    pub fn has_path(&self, path: &Path) -> bool {
        self.lookup(path).map(|value| !value.is_null()).unwrap_or(false)
    }

    pub fn read_string(&self, path: &Path) -> Option<String> {
        self.lookup(path)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn read_long(&self, path: &Path) -> Option<i64> {
        self.lookup(path).and_then(Value::as_i64)
    }

    pub fn read_string_list(&self, path: &Path) -> Option<Vec<String>> {
        self.lookup(path).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    /// Dates are stored as ISO strings and read back as `ScalarValue::String`.
    pub fn read_scalar(&self, path: &Path, scalar_type: ScalarType) -> Option<ScalarValue> {
        match scalar_type {
            ScalarType::String | ScalarType::Date => {
                self.read_string(path).map(ScalarValue::String)
            }
            ScalarType::Long => self.read_long(path).map(ScalarValue::Long),
            ScalarType::ListOfStrings => self
                .read_string_list(path)
                .filter(|items| !items.is_empty())
                .map(ScalarValue::ListOfStrings),
        }
    }

    pub fn put_string(&mut self, path: &Path, value: &str) -> Result<(), ApplicantDataError> {
        *self.slot_mut(path)? = Value::String(value.to_string());
        Ok(())
    }

    pub fn put_long(&mut self, path: &Path, value: i64) -> Result<(), ApplicantDataError> {
        *self.slot_mut(path)? = Value::from(value);
        Ok(())
    }

    pub fn put_null(&mut self, path: &Path) -> Result<(), ApplicantDataError> {
        *self.slot_mut(path)? = Value::Null;
        Ok(())
    }

    pub fn write_scalar(
        &mut self,
        path: &Path,
        value: ScalarValue,
    ) -> Result<(), ApplicantDataError> {
        *self.slot_mut(path)? = match value {
            ScalarValue::String(text) => Value::String(text),
            ScalarValue::Long(number) => Value::from(number),
            ScalarValue::ListOfStrings(items) => {
                Value::Array(items.into_iter().map(Value::String).collect())
            }
        };
        Ok(())
    }

    /// Stamps the producing program and timestamp beside an answered question.
    pub fn put_metadata(
        &mut self,
        question_path: &Path,
        program_id: i64,
        updated_at_millis: i64,
    ) -> Result<(), ApplicantDataError> {
        self.put_long(&question_path.join(Scalar::UpdatedInProgram.key()), program_id)?;
        self.put_long(&question_path.join(Scalar::UpdatedAt.key()), updated_at_millis)
    }

    /// Stores an empty array at `path` unless something is already there.
    pub fn ensure_array(&mut self, path: &Path) -> Result<(), ApplicantDataError> {
        let target = path.without_array_reference();
        if !self.has_path(&target) {
            *self.slot_mut(&target)? = Value::Array(Vec::new());
        }
        Ok(())
    }

    /// Empties the array at `path`, if one is stored there.
    pub fn clear_array(&mut self, path: &Path) -> Result<(), ApplicantDataError> {
        let target = path.without_array_reference();
        if self.lookup(&target).map(Value::is_array).unwrap_or(false) {
            *self.slot_mut(&target)? = Value::Array(Vec::new());
        }
        Ok(())
    }

    /// Removes repeated entities by position. Indices are de-duplicated and removed from the
    /// highest down so the remaining entities keep their relative order; out-of-range indices
    /// are ignored.
    pub fn delete_entities(
        &mut self,
        enumerator_path: &Path,
        indices: &[usize],
    ) -> Result<(), ApplicantDataError> {
        let target = enumerator_path.without_array_reference();
        if !self.lookup(&target).map(Value::is_array).unwrap_or(false) {
            return Ok(());
        }

        let mut ordered = indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        if let Value::Array(entities) = self.slot_mut(&target)? {
            for index in ordered {
                if index < entities.len() {
                    entities.remove(index);
                }
            }
        }
        Ok(())
    }

    pub fn entity_count(&self, enumerator_path: &Path) -> usize {
        self.lookup(&enumerator_path.without_array_reference())
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Entity names in stored order. Entities without a name read as an empty string.
    pub fn entity_names(&self, enumerator_path: &Path) -> Vec<String> {
        let base = enumerator_path.without_array_reference();
        (0..self.entity_count(&base))
            .map(|index| {
                self.read_string(&base.at_index(index).join(Scalar::EntityName.key()))
                    .unwrap_or_default()
            })
            .collect()
    }

    fn lookup(&self, path: &Path) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = current.get(segment.key())?;
            match segment.index() {
                None => {}
                Some(ArrayRef::At(index)) => current = current.get(index)?,
                Some(ArrayRef::Any) => return None,
            }
        }
        Some(current)
    }

    fn slot_mut(&mut self, path: &Path) -> Result<&mut Value, ApplicantDataError> {
        if path.is_empty() {
            return Err(ApplicantDataError::EmptyPath);
        }

        let last = path.segments().len() - 1;
        let mut current = &mut self.root;
        for (position, segment) in path.segments().iter().enumerate() {
            let object = as_object_mut(current, path)?;
            let child = object
                .entry(segment.key().to_string())
                .or_insert(Value::Null);
            current = match segment.index() {
                None => child,
                Some(reference) => {
                    let array = as_array_mut(child, path)?;
                    let index = match reference {
                        ArrayRef::At(index) => index,
                        ArrayRef::Any if position == last => array.len(),
                        ArrayRef::Any => {
                            return Err(ApplicantDataError::UnresolvedArrayIndex {
                                path: path.to_string(),
                            })
                        }
                    };
                    let required = index.checked_add(1).ok_or_else(|| {
                        ApplicantDataError::IndexOutOfRange {
                            path: path.to_string(),
                        }
                    })?;
                    if array.len() < required {
                        array.resize(required, Value::Null);
                    }
                    &mut array[index]
                }
            };
        }
        Ok(current)
    }
}

fn as_object_mut<'v>(
    value: &'v mut Value,
    path: &Path,
) -> Result<&'v mut Map<String, Value>, ApplicantDataError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(ApplicantDataError::ShapeConflict {
            path: path.to_string(),
        }),
    }
}

fn as_array_mut<'v>(
    value: &'v mut Value,
    path: &Path,
) -> Result<&'v mut Vec<Value>, ApplicantDataError> {
    if value.is_null() {
        *value = Value::Array(Vec::new());
    }
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ApplicantDataError::ShapeConflict {
            path: path.to_string(),
        }),
    }
}
