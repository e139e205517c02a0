//! Docker Engine API steps used by the orchestrator

use convoy_core::domain::application::ContainerState;
use convoy_core::domain::command::ContainerCommand;
use reqwest::Method;

use crate::batch::Step;

/// POST images/create?fromImage=<image>
pub fn pull_image(image: &str) -> Step {
    Step::new(Method::POST, "images/create").with_query("fromImage", image)
}

/// POST containers/create?name=<name> with the launch command as body
pub fn create_container(name: &str, command: &ContainerCommand) -> Step {
    Step::new(Method::POST, "containers/create")
        .with_query("name", name)
        .with_body(command.as_value())
}

/// DELETE containers/<name>?force=true
pub fn remove_container(name: &str) -> Step {
    Step::new(Method::DELETE, format!("containers/{}", name)).with_query("force", "true")
}

/// POST containers/<from>/rename?name=<to>
pub fn rename_container(from: &str, to: &str) -> Step {
    Step::new(Method::POST, format!("containers/{}/rename", from)).with_query("name", to)
}

/// POST containers/<name>/start or containers/<name>/stop
pub fn set_state(name: &str, state: ContainerState) -> Step {
    Step::new(Method::POST, format!("containers/{}/{}", name, state))
}
