use crate::events::RequestEvents;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

/// What a task sees of the virtual user running it.
#[derive(Clone)]
pub struct UserContext {
    pub user_id: usize,
    pub events: Arc<RequestEvents>,
}

/// A unit of work a virtual user executes once per scheduling tick.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// Relative pick frequency among the registered tasks.
    fn weight(&self) -> u32 {
        1
    }

    async fn run(&self, ctx: &UserContext) -> Result<()>;
}

pub type BoxedTask = Box<dyn Task>;

#[derive(Default)]
pub struct TaskSet {
    tasks: Vec<Arc<BoxedTask>>,
    total_weight: u32,
}

impl TaskSet {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            total_weight: 0,
        }
    }

    pub fn register(&mut self, task: BoxedTask) -> Result<()> {
        let name = task.name().to_string();

        if self.is_registered(&name) {
            anyhow::bail!("Task '{}' is already registered", name);
        }
        if task.weight() == 0 {
            anyhow::bail!("Task '{}' must have a non-zero weight", name);
        }

        self.total_weight = self
            .total_weight
            .checked_add(task.weight())
            .ok_or_else(|| anyhow::anyhow!("Task '{}' overflows the total task weight", name))?;
        self.tasks.push(Arc::new(task));
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tasks.iter().any(|task| task.name() == name)
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.name().to_string()).collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Picks a task with probability proportional to its weight.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<BoxedTask>> {
        if self.tasks.len() <= 1 {
            return self.tasks.first().cloned();
        }

        let mut roll = rng.gen_range(0..self.total_weight);
        for task in &self.tasks {
            let weight = task.weight();
            if roll < weight {
                return Some(task.clone());
            }
            roll -= weight;
        }
        self.tasks.last().cloned()
    }
}
