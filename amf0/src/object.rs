use crate::Amf0Value;
use std::iter::FromIterator;
use std::slice;
use std::vec;

/// The properties of an AMF0 object or ECMA array.
///
/// Properties are kept in the order they were inserted (or read off the wire) and property
/// names are unique.  Inserting a name that already exists replaces its value in place.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Amf0Object {
    properties: Vec<(String, Amf0Value)>,
}

impl Amf0Object {
    pub fn new() -> Amf0Object {
        Amf0Object {
            properties: Vec::new(),
        }
    }

    /// Sets a property, returning the value it replaced if the name was already present
    pub fn insert<S: Into<String>>(&mut self, name: S, value: Amf0Value) -> Option<Amf0Value> {
        let name = name.into();
        match self.properties.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => Some(std::mem::replace(existing_value, value)),
            None => {
                self.properties.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Amf0Value> {
        self.properties
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Amf0Value> {
        let index = self.properties.iter().position(|(existing, _)| existing == name)?;
        Some(self.properties.remove(index).1)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.properties.get(index).map(|(name, _)| name.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&Amf0Value> {
        self.properties.get(index).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<(String, Amf0Value)> {
        self.properties.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Amf0Value)> for Amf0Object {
    fn from_iter<I: IntoIterator<Item = (S, Amf0Value)>>(iter: I) -> Self {
        let mut object = Amf0Object::new();
        for (name, value) in iter {
            object.insert(name, value);
        }

        object
    }
}

impl IntoIterator for Amf0Object {
    type Item = (String, Amf0Value);
    type IntoIter = vec::IntoIter<(String, Amf0Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.into_iter()
    }
}

impl<'a> IntoIterator for &'a Amf0Object {
    type Item = &'a (String, Amf0Value);
    type IntoIter = slice::Iter<'a, (String, Amf0Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}
