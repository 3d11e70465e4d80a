pub struct EnvironmentVar {
    pub definition_dir: String,
}

impl EnvironmentVar {
    pub fn load() -> Self {
        let definition_dir = dotenv::var("CDS_DEFINITION_DIR")
            .unwrap_or_else(|_| "./definitions".to_string());

        Self { definition_dir }
    }
}
