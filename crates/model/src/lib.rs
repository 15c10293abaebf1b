use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

pub mod driver;
pub mod location;
pub mod stop_point;
pub mod trip;
pub mod trip_status;
pub mod vehicle;

pub trait ExampleData {
    fn example_data() -> Self;
}

/// A record as the store hands it out: the content plus the key it is stored
/// under.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WithId<V>
where
    V: HasId<IdType = String>,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId<IdType = String>,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }
}

impl<V> ExampleData for WithId<V>
where
    V: HasId<IdType = String> + ExampleData,
{
    fn example_data() -> Self {
        Self::new(Id::new("example".to_owned()), V::example_data())
    }
}
