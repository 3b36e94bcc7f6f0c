//! Voice coach window — egui/eframe application.
//!
//! [`CoachApp`] renders the one surface the session core exposes: a
//! connect/disconnect control and a live/idle indicator.  It reads the
//! [`SharedStatus`] snapshot each frame and sends [`SessionCommand`]s to the
//! controller task; all session logic lives behind that channel.

use eframe::egui;
use tokio::sync::mpsc;

use crate::session::{SessionCommand, SessionState, SessionStatus, SharedStatus};

// ---------------------------------------------------------------------------
// CoachApp
// ---------------------------------------------------------------------------

/// eframe application — the coaching session window.
pub struct CoachApp {
    /// Session status written by the controller task.
    status: SharedStatus,
    /// Send commands to the session controller.
    command_tx: mpsc::Sender<SessionCommand>,
    /// Pulse animation phase for the live indicator.
    pulse: f32,
}

impl CoachApp {
    pub fn new(status: SharedStatus, command_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self {
            status,
            command_tx,
            pulse: 0.0,
        }
    }

    fn snapshot(&self) -> SessionStatus {
        self.status.lock().unwrap().clone()
    }

    /// Primary accent colour for the current state.
    fn state_color(state: SessionState) -> egui::Color32 {
        match state {
            SessionState::Idle => egui::Color32::from_rgb(100, 100, 100),
            SessionState::Connecting => egui::Color32::from_rgb(68, 136, 255),
            SessionState::Live => egui::Color32::from_rgb(80, 200, 120),
            SessionState::Failed => egui::Color32::from_rgb(255, 100, 100),
        }
    }

    /// Draw the round session indicator, pulsing while live.
    fn draw_indicator(&self, ui: &mut egui::Ui, state: SessionState) {
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(ui.available_width(), 120.0), egui::Sense::hover());

        let base = 40.0;
        let radius = if state == SessionState::Live {
            base + 4.0 * self.pulse.sin()
        } else {
            base
        };

        let painter = ui.painter();
        painter.circle_stroke(
            rect.center(),
            radius + 8.0,
            egui::Stroke::new(2.0, Self::state_color(state).gamma_multiply(0.4)),
        );
        painter.circle_filled(rect.center(), radius, Self::state_color(state));
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for CoachApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let status = self.snapshot();

        // Pulse animation while a session is up.
        if status.state.is_active() {
            self.pulse += 0.12;
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        } else {
            // Still poll the controller's status at a low rate so remote
            // closes and failures show up without user input.
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(12.0);
            ui.vertical_centered(|ui| {
                ui.heading("AI Coach");
            });

            ui.add_space(8.0);
            self.draw_indicator(ui, status.state);
            ui.add_space(8.0);

            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new(status.state.label())
                        .color(Self::state_color(status.state))
                        .size(16.0),
                );

                if let Some(ref message) = status.error {
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(message.as_str())
                            .color(egui::Color32::from_rgb(255, 136, 68))
                            .size(11.0),
                    );
                }

                ui.add_space(16.0);

                let (caption, command) = if status.state.is_active() {
                    ("End session", SessionCommand::Stop)
                } else {
                    ("Connect coach", SessionCommand::Start)
                };

                if ui
                    .add_sized([180.0, 36.0], egui::Button::new(caption))
                    .clicked()
                {
                    if self.command_tx.try_send(command).is_err() {
                        log::warn!("session controller is not running");
                    }
                }
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // Best-effort: stop the session so the microphone is released even
        // when the window closes mid-conversation.
        let _ = self.command_tx.try_send(SessionCommand::Stop);
        log::info!("voice coach window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::new_shared_status;

    #[test]
    fn app_constructs_with_default_status() {
        let (tx, _rx) = mpsc::channel(4);
        let app = CoachApp::new(new_shared_status(), tx);
        assert_eq!(app.snapshot().state, SessionState::Idle);
    }

    #[test]
    fn each_state_has_a_distinct_color() {
        let states = [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::Live,
            SessionState::Failed,
        ];
        for a in &states {
            for b in &states {
                if a != b {
                    assert_ne!(CoachApp::state_color(*a), CoachApp::state_color(*b));
                }
            }
        }
    }
}
