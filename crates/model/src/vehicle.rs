use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub plate_number: String,
    pub model: Option<String>,
    pub capacity_tonnes: Option<f64>,
}

impl HasId for Vehicle {
    type IdType = String;
}

impl ExampleData for Vehicle {
    fn example_data() -> Self {
        Self {
            plate_number: "HX 42 KT GP".to_owned(),
            model: Some("Volvo FH16".to_owned()),
            capacity_tonnes: Some(34.0),
        }
    }
}
