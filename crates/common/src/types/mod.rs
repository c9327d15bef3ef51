use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: String,
    pub records: usize,
}

impl Health {
    pub fn ok(records: usize) -> Self {
        Self { status: "ok".to_string(), records }
    }
}
