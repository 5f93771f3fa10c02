//! Type-tagged rendering of successful results.
//!
//! Result types are opt-in: a type registered here is emitted as
//! `{"type": <tag>, "value": <value>}` so clients can recover the concrete
//! type behind an abstract result. Unregistered types pass through untouched.

use std::any::TypeId;
use std::collections::HashMap;

use crate::encoder::TaggedValue;

#[derive(Debug, Default, Clone)]
pub struct TypeTags {
    tags: HashMap<TypeId, &'static str>,
}

impl TypeTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `tag` to every result of type `T`. Re-registering replaces the tag.
    pub fn register<T: 'static>(&mut self, tag: &'static str) -> &mut Self {
        self.tags.insert(TypeId::of::<T>(), tag);
        self
    }

    pub fn tag_of(&self, type_id: TypeId) -> Option<&'static str> {
        self.tags.get(&type_id).copied()
    }

    pub fn render(&self, mut tagged: TaggedValue) -> serde_json::Value {
        match self.tag_of(tagged.type_id()) {
            Some(tag) => {
                let value = tagged.value_mut().take();
                serde_json::json!({ "type": tag, "value": value })
            }
            None => tagged.into_value(),
        }
    }
}
