// Export components
pub mod credentials;
pub mod event_commands;
pub mod google_calendar;

// Re-export the handles the bot wires together
pub use credentials::CredentialHandle;
pub use event_commands::EventOrchestrator;
pub use google_calendar::GoogleCalendarClient;
