use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub name: String,
    pub phone: Option<String>,
    pub license_number: Option<String>,
}

impl HasId for Driver {
    type IdType = String;
}

impl ExampleData for Driver {
    fn example_data() -> Self {
        Self {
            name: "Thabo Nkosi".to_owned(),
            phone: Some("+27 82 555 0134".to_owned()),
            license_number: Some("EC-1029384".to_owned()),
        }
    }
}
