use clap::{Parser, ValueEnum};
use nagare::prelude::*;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// --- Demo Nodes ---

/// Prints a start message and emits its output as the action.
struct StartNode;

impl Node for StartNode {
    type Prep = ();
    type Exec = String;

    fn exec(&mut self, _prep: &()) -> Result<String, FlowError> {
        println!("Starting workflow...");
        Ok("started".to_string())
    }

    fn post(&mut self, _ctx: &mut Context, _prep: (), exec: String) -> Result<Option<Action>, FlowError> {
        Ok(Some(exec))
    }
}

/// Prints an end message and stores its prepared input in the context.
struct EndNode;

impl Node for EndNode {
    type Prep = String;
    type Exec = ();

    fn prep(&mut self, _ctx: &Context, _params: &Params) -> Result<String, FlowError> {
        Ok("Preparing to end workflow".to_string())
    }

    fn exec(&mut self, prep: &String) -> Result<(), FlowError> {
        println!("Ending workflow with: {}", prep);
        Ok(())
    }

    fn post(&mut self, ctx: &mut Context, prep: String, _exec: ()) -> Result<Option<Action>, FlowError> {
        ctx.insert("end_node_prep_result", prep);
        Ok(None)
    }
}

/// Writes `number * multiplier` to `currentValue`, branching on `over_20`.
struct SetNumberNode(i64);

impl Node for SetNumberNode {
    type Prep = i64;
    type Exec = i64;

    fn prep(&mut self, _ctx: &Context, params: &Params) -> Result<i64, FlowError> {
        Ok(params.get_or("multiplier", 1))
    }

    fn exec(&mut self, multiplier: &i64) -> Result<i64, FlowError> {
        Ok(self.0 * multiplier)
    }

    fn post(&mut self, ctx: &mut Context, _prep: i64, value: i64) -> Result<Option<Action>, FlowError> {
        ctx.insert("currentValue", value);
        Ok((value > 20).then(|| "over_20".to_string()))
    }
}

/// Adds a fixed amount to `currentValue`.
struct AddNumberNode(i64);

impl Node for AddNumberNode {
    type Prep = i64;
    type Exec = i64;

    fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<i64, FlowError> {
        Ok(ctx.get_as("currentValue")?)
    }

    fn exec(&mut self, current: &i64) -> Result<i64, FlowError> {
        Ok(current + self.0)
    }

    fn post(&mut self, ctx: &mut Context, _prep: i64, value: i64) -> Result<Option<Action>, FlowError> {
        ctx.insert("currentValue", value);
        Ok(Some("added".to_string()))
    }
}

/// Copies `currentValue` into a per-capture context key.
struct CaptureNode(&'static str);

impl Node for CaptureNode {
    type Prep = i64;
    type Exec = i64;

    fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<i64, FlowError> {
        Ok(ctx.get_or("currentValue", -999))
    }

    fn exec(&mut self, value: &i64) -> Result<i64, FlowError> {
        Ok(*value)
    }

    fn post(&mut self, ctx: &mut Context, _prep: i64, value: i64) -> Result<Option<Action>, FlowError> {
        ctx.insert(self.0, value);
        Ok(None)
    }
}

/// Squares every number listed under `numbers`, failing on negative inputs
/// and recovering with zero.
struct SquareBatchNode {
    policy: RetryPolicy,
}

impl BatchNode for SquareBatchNode {
    type Item = i64;
    type Output = i64;

    fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<Vec<i64>, FlowError> {
        let numbers: Vec<Value> = ctx.get_or("numbers", Vec::new());
        Ok(numbers
            .iter()
            .filter_map(|v| i64::from_value(v))
            .collect())
    }

    fn exec_item(&mut self, item: &i64) -> Result<i64, FlowError> {
        if *item < 0 {
            return Err(FlowError::execution(format!("cannot square negative input {}", item)));
        }
        Ok(item * item)
    }

    fn exec_item_fallback(&mut self, item: &i64, error: FlowError) -> Result<i64, FlowError> {
        println!("  Item {} fell back after: {}", item, error);
        Ok(0)
    }

    fn post(&mut self, ctx: &mut Context, _items: Vec<i64>, results: Vec<i64>) -> Result<Option<Action>, FlowError> {
        ctx.insert("squares", results);
        Ok(None)
    }
}

/// Runs the linear sub-graph once per listed multiplier.
struct MultiplierPlan {
    multipliers: Vec<i64>,
}

impl BatchPlan for MultiplierPlan {
    fn prep_batch(&mut self, _ctx: &Context, _params: &Params) -> Result<Vec<Params>, FlowError> {
        Ok(self
            .multipliers
            .iter()
            .map(|m| Params::from([("multiplier", *m)]))
            .collect())
    }

    fn post_batch(&mut self, ctx: &mut Context, batches: Vec<Params>) -> Result<Option<Action>, FlowError> {
        ctx.insert("batches_run", batches.len() as i64);
        Ok(Some("batched".to_string()))
    }
}

// --- CLI ---

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    /// start -> end on the "started" action
    Simple,
    /// set -> add -> capture
    Linear,
    /// set branches to a capture node on "over_20"
    Branching,
    /// per-item retries and fallbacks over `numbers`
    Batch,
    /// the linear graph once per multiplier
    BatchFlow,
}

/// Runs the Nagare demo workflows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The demo workflow to run
    #[arg(value_enum)]
    demo: Demo,

    /// Path to a JSON object used as the flow's params
    #[arg(short, long)]
    params: Option<String>,

    /// Extra param as key=value; the value is parsed as JSON, falling back to text
    #[arg(long = "param", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Path to a JSON object used as the initial context
    #[arg(short, long)]
    context: Option<String>,

    /// Path to a retry policy JSON file for the batch demo
    #[arg(short, long)]
    retry: Option<String>,

    /// Log engine diagnostics at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let params = load_params(&cli);
    let mut ctx = match &cli.context {
        Some(path) => load_map(path),
        None => Context::new(),
    };
    let policy = match &cli.retry {
        Some(path) => {
            let json = read_file(path);
            RetryPolicy::from_json(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid retry policy: {}", e)))
        }
        None => RetryPolicy::from_millis(2, 10).unwrap_or_default(),
    };

    println!("--- Running {:?} Workflow ---", cli.demo);
    let start = Instant::now();
    let outcome = match cli.demo {
        Demo::Simple => run_simple(&mut ctx, params),
        Demo::Linear => run_linear(&mut ctx, params),
        Demo::Branching => run_branching(&mut ctx, params),
        Demo::Batch => run_batch(&mut ctx, params, policy),
        Demo::BatchFlow => run_batch_flow(&mut ctx, params),
    };
    let elapsed = start.elapsed();

    match outcome {
        Ok(action) => {
            println!("\nWorkflow Finished!");
            match action {
                Some(action) => println!("  -> Terminal action: '{}'", action),
                None => println!("  -> Terminal action: <none>"),
            }
        }
        Err(e) => exit_with_error(&format!("Workflow failed: {}", e)),
    }

    let rendered = serde_json::to_string_pretty(&ctx)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to render context: {}", e)));
    println!("\n--- Final Context ---\n{}", rendered);
    println!("\nTotal Execution:      {:?}", elapsed);
}

fn run_simple(ctx: &mut Context, params: Params) -> Result<Option<Action>, FlowError> {
    let mut flow = Flow::new().with_name("simple").with_params(params);
    let start = flow.add(StartNode);
    let end = flow.add(EndNode);
    flow.connect_on(start, "started", end)?;
    flow.set_start(start)?;
    flow.run(ctx)
}

fn linear_flow(name: &str, params: Params) -> Result<Flow, FlowError> {
    let mut flow = Flow::new().with_name(name).with_params(params);
    let set = flow.add(SetNumberNode(10));
    let add = flow.add(AddNumberNode(5));
    let capture = flow.add(CaptureNode("capturedValue"));
    flow.connect(set, add)?;
    flow.connect_on(add, "added", capture)?;
    flow.set_start(set)?;
    Ok(flow)
}

fn run_linear(ctx: &mut Context, params: Params) -> Result<Option<Action>, FlowError> {
    linear_flow("linear", params)?.run(ctx)
}

fn run_branching(ctx: &mut Context, params: Params) -> Result<Option<Action>, FlowError> {
    let mut flow = Flow::new().with_name("branching").with_params(params);
    let set = flow.add(SetNumberNode(10));
    let add = flow.add(AddNumberNode(5));
    let capture_default = flow.add(CaptureNode("capturedDefault"));
    let capture_over_20 = flow.add(CaptureNode("capturedOver20"));
    flow.connect(set, add)?;
    flow.connect_on(set, "over_20", capture_over_20)?;
    flow.connect_on(add, "added", capture_default)?;
    flow.set_start(set)?;
    flow.run(ctx)
}

fn run_batch(ctx: &mut Context, params: Params, policy: RetryPolicy) -> Result<Option<Action>, FlowError> {
    if !ctx.contains_key("numbers") {
        ctx.insert("numbers", vec![1i64, -2, 3]);
    }
    let mut flow = Flow::new().with_name("batch").with_params(params);
    let square = flow.add(SquareBatchNode { policy });
    flow.set_start(square)?;
    flow.run(ctx)
}

fn run_batch_flow(ctx: &mut Context, params: Params) -> Result<Option<Action>, FlowError> {
    let flow = linear_flow("batch-flow", params)?;
    let plan = MultiplierPlan {
        multipliers: vec![1, 2, 3],
    };
    BatchFlow::new(flow, plan).run(ctx)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "nagare=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_params(cli: &Cli) -> Params {
    let mut params = match &cli.params {
        Some(path) => load_map(path),
        None => Params::new(),
    };
    for pair in &cli.overrides {
        let (key, raw) = pair
            .split_once('=')
            .unwrap_or_else(|| exit_with_error(&format!("Param '{}' is not in KEY=VALUE form", pair)));
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        params.insert(key, value);
    }
    params
}

fn load_map(path: &str) -> ValueMap {
    let json = read_file(path);
    ValueMap::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load '{}': {}", path, e)))
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read file '{}': {}", path, e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
