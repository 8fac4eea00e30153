use crate::models::session::SessionSnapshot;
use crate::services::analysis::Analyzer;
use crate::services::workflow::{WorkflowController, WorkflowError};
use log::info;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, WorkflowError>>;

pub enum Command {
    Submit {
        text: Option<String>,
        reply: Reply<()>,
    },
    SetDraft {
        text: String,
        reply: Reply<()>,
    },
    Upload {
        filename: String,
        content: String,
        reply: Reply<usize>,
    },
    Cancel {
        reply: Reply<()>,
    },
    Back {
        reply: Reply<()>,
    },
    DismissNotice {
        reply: Reply<()>,
    },
}

/// Cloneable handle to the task that owns the workflow controller.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn spawn<A: Analyzer>(controller: WorkflowController<A>) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(controller.snapshot());
        let task = tokio::spawn(run(controller, commands_rx, snapshots_tx));

        (
            Self {
                commands: commands_tx,
                snapshots: snapshots_rx,
            },
            task,
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Resolves with the first snapshot that satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, WorkflowError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| WorkflowError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    pub async fn submit(&self, text: Option<String>) -> Result<(), WorkflowError> {
        self.request(|reply| Command::Submit { text, reply }).await
    }

    pub async fn set_draft(&self, text: String) -> Result<(), WorkflowError> {
        self.request(|reply| Command::SetDraft { text, reply }).await
    }

    pub async fn upload(&self, filename: String, content: String) -> Result<usize, WorkflowError> {
        self.request(|reply| Command::Upload {
            filename,
            content,
            reply,
        })
        .await
    }

    pub async fn cancel(&self) -> Result<(), WorkflowError> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    pub async fn back(&self) -> Result<(), WorkflowError> {
        self.request(|reply| Command::Back { reply }).await
    }

    pub async fn dismiss_notice(&self) -> Result<(), WorkflowError> {
        self.request(|reply| Command::DismissNotice { reply }).await
    }

    async fn send(&self, command: Command) -> Result<(), WorkflowError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WorkflowError::SessionClosed)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T, WorkflowError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(build(reply_tx)).await?;
        reply_rx.await.map_err(|_| WorkflowError::SessionClosed)?
    }
}

async fn run<A: Analyzer>(
    mut controller: WorkflowController<A>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut controller, command, &snapshots),
                None => break,
            },
            Some(event) = controller.next_event() => controller.apply(event),
        }
        publish(&controller, &snapshots);
    }

    controller.cancel_scan();
    info!("Session closed");
}

/// Publishes the new snapshot before replying so callers never read a view
/// older than their own command.
fn handle_command<A: Analyzer>(
    controller: &mut WorkflowController<A>,
    command: Command,
    snapshots: &watch::Sender<SessionSnapshot>,
) {
    match command {
        Command::Submit { text, reply } => {
            let outcome = match text {
                Some(text) => controller.submit(&text),
                None => controller.submit_draft(),
            };
            publish(controller, snapshots);
            let _ = reply.send(outcome);
        }
        Command::SetDraft { text, reply } => {
            controller.input_mut().set_text(text);
            publish(controller, snapshots);
            let _ = reply.send(Ok(()));
        }
        Command::Upload {
            filename,
            content,
            reply,
        } => {
            let outcome = controller
                .input_mut()
                .load_upload(&filename, &content)
                .map_err(WorkflowError::from);
            publish(controller, snapshots);
            let _ = reply.send(outcome);
        }
        Command::Cancel { reply } => {
            controller.cancel_scan();
            publish(controller, snapshots);
            let _ = reply.send(Ok(()));
        }
        Command::Back { reply } => {
            let outcome = controller.go_back();
            publish(controller, snapshots);
            let _ = reply.send(outcome);
        }
        Command::DismissNotice { reply } => {
            controller.dismiss_notice();
            publish(controller, snapshots);
            let _ = reply.send(Ok(()));
        }
    }
}

fn publish<A: Analyzer>(controller: &WorkflowController<A>, snapshots: &watch::Sender<SessionSnapshot>) {
    snapshots.send_replace(controller.snapshot());
}
