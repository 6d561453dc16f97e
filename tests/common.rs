//! Common node fixtures shared by the integration tests.
use nagare::prelude::*;
use std::time::Duration;

/// Writes `number * multiplier` (multiplier read from params, default 1) to
/// `currentValue` and returns `over_20` when the result exceeds 20.
#[allow(dead_code)]
pub struct SetNumberNode {
    pub number: i64,
}

impl Node for SetNumberNode {
    type Prep = i64;
    type Exec = i64;

    fn prep(&mut self, _ctx: &Context, params: &Params) -> Result<i64, FlowError> {
        Ok(params.get_or("multiplier", 1))
    }

    fn exec(&mut self, multiplier: &i64) -> Result<i64, FlowError> {
        Ok(self.number * multiplier)
    }

    fn post(
        &mut self,
        ctx: &mut Context,
        _prep: i64,
        value: i64,
    ) -> Result<Option<Action>, FlowError> {
        ctx.insert("currentValue", value);
        Ok((value > 20).then(|| "over_20".to_string()))
    }
}

/// Adds a fixed amount to `currentValue`, failing fast when it is absent.
#[allow(dead_code)]
pub struct AddNumberNode {
    pub number: i64,
}

impl Node for AddNumberNode {
    type Prep = i64;
    type Exec = i64;

    fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<i64, FlowError> {
        Ok(ctx.get_as("currentValue")?)
    }

    fn exec(&mut self, current: &i64) -> Result<i64, FlowError> {
        Ok(current + self.number)
    }

    fn post(
        &mut self,
        ctx: &mut Context,
        _prep: i64,
        value: i64,
    ) -> Result<Option<Action>, FlowError> {
        ctx.insert("currentValue", value);
        Ok(Some("added".to_string()))
    }
}

/// Captures `currentValue` (or -999 when absent) in its own field.
#[allow(dead_code)]
pub struct ResultCaptureNode {
    pub captured: i64,
    pub runs: usize,
}

impl ResultCaptureNode {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            captured: -999,
            runs: 0,
        }
    }
}

impl Node for ResultCaptureNode {
    type Prep = i64;
    type Exec = ();

    fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<i64, FlowError> {
        Ok(ctx.get_or("currentValue", -999))
    }

    fn exec(&mut self, value: &i64) -> Result<(), FlowError> {
        self.captured = *value;
        self.runs += 1;
        Ok(())
    }
}

/// Appends its tag to the `visited` list in the context and returns a fixed action.
#[allow(dead_code)]
pub struct VisitNode {
    pub tag: &'static str,
    pub action: Option<&'static str>,
    pub seen_params: Vec<Params>,
}

impl VisitNode {
    #[allow(dead_code)]
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            action: None,
            seen_params: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn returning(tag: &'static str, action: &'static str) -> Self {
        Self {
            tag,
            action: Some(action),
            seen_params: Vec::new(),
        }
    }
}

impl Node for VisitNode {
    type Prep = ();
    type Exec = ();

    fn name(&self) -> &str {
        self.tag
    }

    fn prep(&mut self, _ctx: &Context, params: &Params) -> Result<(), FlowError> {
        self.seen_params.push(params.clone());
        Ok(())
    }

    fn exec(&mut self, _prep: &()) -> Result<(), FlowError> {
        Ok(())
    }

    fn post(&mut self, ctx: &mut Context, _prep: (), _exec: ()) -> Result<Option<Action>, FlowError> {
        let mut visited: Vec<Value> = ctx.get_or("visited", Vec::new());
        visited.push(Value::from(self.tag));
        ctx.insert("visited", visited);
        Ok(self.action.map(str::to_string))
    }
}

/// Always fails in its execute phase.
#[allow(dead_code)]
pub struct FailingNode;

impl Node for FailingNode {
    type Prep = ();
    type Exec = ();

    fn exec(&mut self, _prep: &()) -> Result<(), FlowError> {
        Err(FlowError::execution("boom"))
    }
}

/// Fails its first `failures` calls, then returns `"ok"`. Records every call,
/// wait and fallback without actually sleeping.
#[allow(dead_code)]
pub struct FlakyNode {
    pub failures: usize,
    pub policy: RetryPolicy,
    pub fallback: Option<Result<String, String>>,
    pub exec_calls: usize,
    pub waits: Vec<Duration>,
    pub fallback_errors: Vec<String>,
}

impl FlakyNode {
    #[allow(dead_code)]
    pub fn new(failures: usize, max_attempts: u32) -> Self {
        Self {
            failures,
            policy: RetryPolicy::new(max_attempts, Duration::from_millis(5)).unwrap(),
            fallback: None,
            exec_calls: 0,
            waits: Vec::new(),
            fallback_errors: Vec::new(),
        }
    }

    /// Recovers with `value` once retries are exhausted.
    #[allow(dead_code)]
    pub fn recovering_with(mut self, value: &str) -> Self {
        self.fallback = Some(Ok(value.to_string()));
        self
    }

    /// Raises `message` from the fallback once retries are exhausted.
    #[allow(dead_code)]
    pub fn failing_fallback(mut self, message: &str) -> Self {
        self.fallback = Some(Err(message.to_string()));
        self
    }
}

impl Node for FlakyNode {
    type Prep = ();
    type Exec = String;

    fn name(&self) -> &str {
        "flaky"
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    fn wait(&mut self, delay: Duration) {
        self.waits.push(delay);
    }

    fn exec(&mut self, _prep: &()) -> Result<String, FlowError> {
        self.exec_calls += 1;
        if self.exec_calls <= self.failures {
            Err(FlowError::execution(format!("failure #{}", self.exec_calls)))
        } else {
            Ok("ok".to_string())
        }
    }

    fn exec_fallback(&mut self, _prep: &(), error: FlowError) -> Result<String, FlowError> {
        self.fallback_errors.push(error.to_string());
        match &self.fallback {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(FlowError::execution(message)),
            None => Err(FlowError::retries_exhausted(
                "flaky",
                self.policy.max_attempts(),
                error,
            )),
        }
    }

    fn post(&mut self, ctx: &mut Context, _prep: (), exec: String) -> Result<Option<Action>, FlowError> {
        ctx.insert("flaky_result", exec);
        Ok(None)
    }
}

/// Doubles every number listed under `items`. Items listed in `poisoned`
/// always fail and fall back to `-1`, or to an error when `fatal_fallback` is set.
#[allow(dead_code)]
pub struct DoublingBatchNode {
    pub poisoned: Vec<i64>,
    pub fatal_fallback: bool,
    pub policy: RetryPolicy,
    pub calls: Vec<i64>,
    pub waits: usize,
    pub fallbacks: Vec<(i64, String)>,
}

impl DoublingBatchNode {
    #[allow(dead_code)]
    pub fn new(poisoned: Vec<i64>, max_attempts: u32) -> Self {
        Self {
            poisoned,
            fatal_fallback: false,
            policy: RetryPolicy::from_millis(max_attempts, 1).unwrap(),
            calls: Vec::new(),
            waits: 0,
            fallbacks: Vec::new(),
        }
    }
}

impl BatchNode for DoublingBatchNode {
    type Item = i64;
    type Output = i64;

    fn name(&self) -> &str {
        "doubler"
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    fn wait(&mut self, _delay: Duration) {
        self.waits += 1;
    }

    fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<Vec<i64>, FlowError> {
        let items: Vec<Value> = ctx.get_as("items")?;
        Ok(items.iter().filter_map(i64::from_value).collect())
    }

    fn exec_item(&mut self, item: &i64) -> Result<i64, FlowError> {
        self.calls.push(*item);
        if self.poisoned.contains(item) {
            return Err(FlowError::execution(format!("poisoned item {}", item)));
        }
        Ok(item * 2)
    }

    fn exec_item_fallback(&mut self, item: &i64, error: FlowError) -> Result<i64, FlowError> {
        self.fallbacks.push((*item, error.to_string()));
        if self.fatal_fallback {
            Err(FlowError::execution(format!("cannot recover item {}", item)))
        } else {
            Ok(-1)
        }
    }

    fn post(
        &mut self,
        ctx: &mut Context,
        _items: Vec<i64>,
        results: Vec<i64>,
    ) -> Result<Option<Action>, FlowError> {
        ctx.insert("doubled", results);
        Ok(Some("doubled".to_string()))
    }
}

/// Reads the `visited` list written by `VisitNode`s.
#[allow(dead_code)]
pub fn visited(ctx: &Context) -> Vec<String> {
    ctx.get_or::<Vec<Value>>("visited", Vec::new())
        .iter()
        .filter_map(String::from_value)
        .collect()
}
