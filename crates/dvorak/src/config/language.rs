use serde::{Deserialize, Serialize};

/// Language profile: sandbox image plus compile and run commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "C++ 17 (GCC)")
    pub name: String,

    /// Sandbox image reference (e.g., "dvorak-cpp:latest")
    pub image: String,

    /// Canonical source file name in the sandbox (e.g., "Main.cpp")
    pub source_name: String,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Name of the artifact the run command refers to as `{binary}`
    pub fn binary_name(&self) -> &str {
        match self.compile {
            Some(ref compile) => &compile.output_name,
            None => &self.source_name,
        }
    }

    /// Compile argument vector with placeholders expanded
    pub fn compile_command(&self) -> Option<Vec<String>> {
        self.compile.as_ref().map(|compile| {
            Self::expand_command(&compile.command, &self.source_name, &compile.output_name)
        })
    }

    /// Run argument vector with placeholders expanded
    pub fn run_command(&self) -> Vec<String> {
        Self::expand_command(&self.run.command, &self.source_name, self.binary_name())
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], source: &str, binary: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{output}", binary)
                    .replace("{binary}", binary)
            })
            .collect()
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}
    pub command: Vec<String>,

    /// Output binary name (e.g., "main")
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}
    pub command: Vec<String>,
}

fn default_output_name() -> String {
    "main".to_owned()
}
