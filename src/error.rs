/// Errors raised while bootstrapping a scene.
///
/// Only [`SceneError::ContainerNotFound`] comes from user input. The other
/// two wrap failures of the graphics stack or the host document.
#[derive(Debug, thiserror::Error)]
pub enum SceneError
{
        #[error("container not found: no element matches selector `{selector}`")]
        ContainerNotFound { selector: String },

        #[error("failed to create renderer: {0:#}")]
        Renderer(anyhow::Error),

        #[error("failed to mount drawing surface: {0:#}")]
        Mount(anyhow::Error),
}

impl SceneError
{
        /// The unresolved selector, for [`SceneError::ContainerNotFound`].
        pub fn selector(&self) -> Option<&str>
        {
                match self
                {
                        SceneError::ContainerNotFound {
                                selector,
                        } => Some(selector.as_str()),
                        _ => None,
                }
        }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError
{
        #[error("empty color string")]
        Empty,

        #[error("invalid hex color `{0}`")]
        InvalidHex(String),

        #[error("invalid functional color `{0}`")]
        InvalidFunction(String),

        #[error("unknown color `{0}`")]
        UnknownName(String),
}
