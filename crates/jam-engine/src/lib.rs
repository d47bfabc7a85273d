//! Jam Engine - the embedding facade.
//!
//! An [`Engine`] owns the builtin registry, host-registered functions, the
//! execution options, and the optional localization and stats hooks. It
//! drives the pipeline stage by stage - parse, validate, link, compile,
//! execute - accumulating diagnostics and stopping at the first stage that
//! reports an error. The precompiled-artifact path skips the front end but
//! always re-runs linking, because the host's function set is not part of
//! the artifact.

pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use jam_artifact::{Artifact, ArtifactMetadata};
use jam_compiler::program::Program;
use jam_compiler::{lexer, linker, lower, parser, validator};
use jam_core::ast::Stmt;
use jam_core::diag::{Diagnostic, MessageCode, TemplateProvider};
use jam_core::limits::{CancellationToken, ExecutionOptions};
use jam_core::value::Value;
use jam_core::ExecutionContext;
use jam_runtime::{run_program, FunctionRegistry, ScriptFunction};

pub use jam_core::diag::Severity;
pub use stats::{MemoryStatsSink, PipelineStage, StatsSink};

const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A compiled, linked script ready for execution, plus the non-fatal
/// diagnostics produced while compiling it.
pub struct CompiledScript {
    program: Program,
    functions: Vec<Arc<dyn ScriptFunction>>,
    pub warnings: Vec<Diagnostic>,
}

impl std::fmt::Debug for CompiledScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledScript")
            .field("functions", &self.functions.len())
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// The outcome of one execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// The final `data` value; `None` when execution failed.
    pub value: Option<Value>,
    /// Diagnostics from this run. A successful run carries only
    /// Info/Warning entries.
    pub diagnostics: Vec<Diagnostic>,
    /// The completion reason recorded by `return` or `fail`.
    pub completion_message: Option<String>,
    pub success: bool,
}

/// The embedding entry point.
pub struct Engine {
    builtins: FunctionRegistry,
    host_functions: Vec<Arc<dyn ScriptFunction>>,
    options: ExecutionOptions,
    templates: Option<Arc<dyn TemplateProvider>>,
    stats: Option<Arc<dyn StatsSink>>,
}

impl Engine {
    /// An engine with the full builtin library, no host functions, and
    /// unbounded execution (trusted embedding).
    pub fn new() -> Self {
        Engine {
            builtins: FunctionRegistry::builtins(),
            host_functions: Vec::new(),
            options: ExecutionOptions::default(),
            templates: None,
            stats: None,
        }
    }

    /// Replace the execution options for subsequent executions.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a host function. A host function that shares a builtin's
    /// name shadows it; the linker reports that with a JM4100 warning.
    pub fn register_function(&mut self, function: Arc<dyn ScriptFunction>) {
        self.host_functions.push(function);
    }

    /// Install a localization template provider used by
    /// [`Engine::render`].
    pub fn with_template_provider(mut self, provider: Arc<dyn TemplateProvider>) -> Self {
        self.templates = Some(provider);
        self
    }

    /// Install a per-stage wall-clock stats sink.
    pub fn with_stats_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.stats = Some(sink);
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Format a diagnostic's message, honoring the template provider and
    /// falling back to the default English template.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        jam_core::diag::templates::format_message(
            diagnostic.code,
            &diagnostic.args,
            self.templates.as_deref(),
        )
    }

    fn record(&self, stage: PipelineStage, started: Instant) {
        if let Some(sink) = &self.stats {
            sink.record(stage, started.elapsed());
        }
    }

    /// Every callable visible to scripts, host functions shadowing
    /// builtins of the same name.
    fn resolution(&self) -> IndexMap<String, Arc<dyn ScriptFunction>> {
        let mut merged: IndexMap<String, Arc<dyn ScriptFunction>> = IndexMap::new();
        for name in self.builtins.names() {
            if let Some(function) = self.builtins.get(&name) {
                merged.insert(name, function);
            }
        }
        for function in &self.host_functions {
            merged.insert(function.signature().name.clone(), Arc::clone(function));
        }
        merged
    }

    fn function_table(&self) -> jam_core::FunctionTable {
        jam_core::FunctionTable::merge(
            self.builtins.signatures(),
            self.host_functions.iter().map(|f| f.signature().clone()),
        )
    }

    /// Parse and validate source into an AST, accumulating diagnostics.
    fn front_end(&self, source: &str) -> Result<(Vec<Stmt>, Vec<Diagnostic>), Vec<Diagnostic>> {
        let started = Instant::now();
        let tokens = lexer::tokenize(source).map_err(|diags| {
            self.record(PipelineStage::Parse, started);
            diags
        })?;
        let ast = parser::parse(tokens).map_err(|diags| {
            self.record(PipelineStage::Parse, started);
            diags
        })?;
        self.record(PipelineStage::Parse, started);

        let started = Instant::now();
        let diagnostics = validator::validate(&ast);
        self.record(PipelineStage::Validate, started);
        if diagnostics.iter().any(|d| d.is_error()) {
            return Err(diagnostics);
        }
        Ok((ast, diagnostics))
    }

    /// Link and lower a validated AST.
    fn back_end(
        &self,
        ast: &[Stmt],
        mut warnings: Vec<Diagnostic>,
    ) -> Result<CompiledScript, Vec<Diagnostic>> {
        let table = self.function_table();
        let started = Instant::now();
        let (slots, link_diags) = linker::link(ast, &table);
        self.record(PipelineStage::Link, started);
        let has_errors = link_diags.iter().any(|d| d.is_error());
        warnings.extend(link_diags);
        if has_errors {
            return Err(warnings);
        }

        let started = Instant::now();
        let program = lower::lower(ast, slots);
        self.record(PipelineStage::Compile, started);

        let resolution = self.resolution();
        let mut functions = Vec::with_capacity(program.slots.len());
        for slot in &program.slots {
            match resolution.get(&slot.name) {
                Some(function) => functions.push(Arc::clone(function)),
                None => {
                    warnings.push(Diagnostic::error(
                        MessageCode::UndefinedFunction,
                        vec![slot.name.clone()],
                        None,
                    ));
                    return Err(warnings);
                }
            }
        }

        Ok(CompiledScript {
            program,
            functions,
            warnings,
        })
    }

    /// Compile source text into an executable script.
    ///
    /// # Errors
    ///
    /// Returns the accumulated diagnostics of the failing stage (plus any
    /// earlier warnings).
    pub fn compile(&self, source: &str) -> Result<CompiledScript, Vec<Diagnostic>> {
        let (ast, warnings) = self.front_end(source)?;
        self.back_end(&ast, warnings)
    }

    /// Serialize source into a precompiled artifact. The script is fully
    /// compiled first so compile-time errors surface at build time.
    pub fn compile_to_artifact(
        &self,
        source: &str,
        script_name: Option<String>,
    ) -> Result<Vec<u8>, Vec<Diagnostic>> {
        let (ast, warnings) = self.front_end(source)?;
        self.back_end(&ast, warnings)?;
        let artifact = Artifact::new(ArtifactMetadata::new(script_name, COMPILER_VERSION), ast);
        artifact
            .to_bytes()
            .map_err(|e| vec![artifact_diagnostic(&e)])
    }

    /// Load a precompiled artifact. Skips the front end but re-runs
    /// linking against the current function table.
    pub fn compile_from_artifact(&self, bytes: &[u8]) -> Result<CompiledScript, Vec<Diagnostic>> {
        let started = Instant::now();
        let artifact = Artifact::from_bytes(bytes).map_err(|e| vec![artifact_diagnostic(&e)])?;
        self.record(PipelineStage::Deserialize, started);
        self.back_end(&artifact.into_ast(), Vec::new())
    }

    /// Execute a compiled script against `data`.
    pub fn execute(&self, script: &CompiledScript, data: Value) -> ExecutionReport {
        let mut ctx = ExecutionContext::new(self.options.clone());
        self.execute_with_context(script, data, &mut ctx)
    }

    /// Execute with a host cancellation token linked into the combined
    /// token the limiter controls.
    pub fn execute_with_token(
        &self,
        script: &CompiledScript,
        data: Value,
        token: &CancellationToken,
    ) -> ExecutionReport {
        let mut ctx = ExecutionContext::with_host_token(self.options.clone(), token);
        self.execute_with_context(script, data, &mut ctx)
    }

    fn execute_with_context(
        &self,
        script: &CompiledScript,
        data: Value,
        ctx: &mut ExecutionContext,
    ) -> ExecutionReport {
        let mut diagnostics = script.warnings.clone();
        let started = Instant::now();
        let result = run_program(&script.program, &script.functions, data, ctx);
        self.record(PipelineStage::Execute, started);
        match result {
            Ok(value) => {
                tracing::debug!(
                    statements = ctx.statements(),
                    iterations = ctx.iterations(),
                    "execution finished"
                );
                ExecutionReport {
                    value: Some(value),
                    diagnostics,
                    completion_message: ctx.completion_message().map(str::to_string),
                    success: true,
                }
            }
            Err(error) => {
                tracing::debug!(code = %error.code, "execution failed");
                let completion_message = ctx.completion_message().map(str::to_string);
                diagnostics.push(error.into_diagnostic());
                ExecutionReport {
                    value: None,
                    diagnostics,
                    completion_message,
                    success: false,
                }
            }
        }
    }

    /// Compile and execute in one step.
    pub fn run(&self, source: &str, data: Value) -> ExecutionReport {
        match self.compile(source) {
            Ok(script) => self.execute(&script, data),
            Err(diagnostics) => ExecutionReport {
                value: None,
                diagnostics,
                completion_message: None,
                success: false,
            },
        }
    }

    /// Compile and execute against a JSON payload.
    pub fn run_json(&self, source: &str, data_json: &str) -> ExecutionReport {
        match Value::parse_json(data_json) {
            Ok(data) => self.run(source, data),
            Err(message) => ExecutionReport {
                value: None,
                diagnostics: vec![Diagnostic::error(
                    MessageCode::InvalidJson,
                    vec![message],
                    None,
                )],
                completion_message: None,
                success: false,
            },
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

fn artifact_diagnostic(error: &jam_artifact::ArtifactError) -> Diagnostic {
    Diagnostic::error(MessageCode::RuntimeFault, vec![error.to_string()], None)
}
