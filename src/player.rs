use crate::server_utils::sanitize_name;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    name: String,
}

impl Player {
    pub fn new(name: &str) -> Self {
        Self {
            name: sanitize_name(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
