pub mod client;
pub mod display;
pub mod i18n;

pub use client::{ChiralClient, ClientInfo};
pub use display::{escape_html, RenderState, Renderer};
pub use i18n::{I18n, Translator};
