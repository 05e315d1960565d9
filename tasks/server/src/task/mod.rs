use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: Uuid,
    title: String,
    description: Option<String>,
    done: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: Uuid,
        title: String,
        description: Option<String>,
        done: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            done,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the task is done.
    pub fn done(&self) -> bool {
        self.done
    }

    /// Returns the creation timestamp of the task.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-update timestamp of the task.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description,
            model.done,
            model.created_at,
            model.updated_at,
        )
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Represents a duplicate title error (a task with the same title already exists).
    #[error("Task with title '{0}' already exists")]
    DuplicateTitle(String),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a task not found error. Also covers malformed IDs,
    /// since no task can exist under an ID that never parses.
    #[error("Task with ID '{0}' not found")]
    TaskNotFound(String),
    /// Represents a missing or blank title.
    #[error("Task title must not be empty")]
    InvalidTitle,
}

/// Shared state for task routers and handlers.
#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService {
        TaskService { db }
    }

    /// Creates a new task in the database.
    ///
    /// # Arguments
    ///
    /// * `title` - The title of the task. Trimmed; must not be blank.
    /// * `description` - An optional description. Trimmed when present.
    /// * `done` - Whether the task is already done. Defaults to `false`.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        title: &str,
        description: Option<String>,
        done: Option<bool>,
    ) -> Result<Task, TaskServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskServiceError::InvalidTitle);
        }

        let now = Utc::now();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            title: ActiveValue::Set(title.to_string()),
            description: ActiveValue::Set(description.map(|d| d.trim().to_string())),
            done: ActiveValue::Set(done.unwrap_or(false)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let created_model = active_model.insert(self.db).await.map_err(|err| {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                TaskServiceError::DuplicateTitle(title.to_string())
            } else {
                TaskServiceError::Database(err)
            }
        })?;
        Ok(Task::from(created_model))
    }

    /// Retrieves all tasks from the database, in insertion order.
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = task::Entity::find()
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves a task by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to retrieve.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Task` if it exists, or `TaskNotFound` if it
    /// does not or the ID is malformed.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: &str) -> Result<Task, TaskServiceError> {
        let task_id = Self::parse_id(id)?;
        let task_model = task::Entity::find_by_id(task_id)
            .one(self.db)
            .await?
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;
        Ok(Task::from(task_model))
    }

    /// Updates a task by its ID, applying only the supplied fields.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to update.
    /// * `new_title` - A new title, if it should change. Trimmed; must not be blank.
    /// * `new_description` - A new description, if it should change. Trimmed.
    /// * `new_done` - A new done flag, if it should change.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn update_task_by_id(
        &self,
        id: &str,
        new_title: Option<String>,
        new_description: Option<String>,
        new_done: Option<bool>,
    ) -> Result<Task, TaskServiceError> {
        let task_id = Self::parse_id(id)?;
        let task_to_update = task::Entity::find_by_id(task_id)
            .one(self.db)
            .await?
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;

        let mut active_model: task::ActiveModel = task_to_update.into();
        if let Some(title) = new_title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(TaskServiceError::InvalidTitle);
            }
            active_model.title = ActiveValue::Set(title);
        }
        if let Some(description) = new_description {
            active_model.description = ActiveValue::Set(Some(description.trim().to_string()));
        }
        if let Some(done) = new_done {
            active_model.done = ActiveValue::Set(done);
        }
        active_model.updated_at = ActiveValue::Set(Utc::now());
        let updated_model = active_model.update(self.db).await?;

        Ok(Task::from(updated_model))
    }

    /// Deletes a task by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to delete.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Task` as it was immediately before removal,
    /// or `TaskNotFound` otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, id: &str) -> Result<Task, TaskServiceError> {
        let task_id = Self::parse_id(id)?;
        let task_to_delete = task::Entity::find_by_id(task_id)
            .one(self.db)
            .await?
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;

        let task_copy = Task::from(task_to_delete.clone());
        task::Entity::delete_by_id(task_id).exec(self.db).await?;
        Ok(task_copy)
    }

    fn parse_id(id: &str) -> Result<Uuid, TaskServiceError> {
        Uuid::parse_str(id).map_err(|_| TaskServiceError::TaskNotFound(id.to_string()))
    }
}
