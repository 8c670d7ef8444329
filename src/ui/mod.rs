// src/ui/mod.rs

use crate::app::App;
use ratatui::prelude::*;

mod layout;
mod widgets;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let layout = layout::create_layout(area);

    widgets::input::render_input(frame, app, layout.input);
    widgets::progress::render_progress(frame, app, layout.progress);
    widgets::analysis_view::render_analysis_view(frame, app, layout.report);
    widgets::summary::render_summary(frame, app, layout.summary);
    widgets::footer::render_footer(frame, app, layout.footer);

    if app.show_disclaimer {
        widgets::disclaimer_popup::render_disclaimer_popup(frame, area);
    }
}
