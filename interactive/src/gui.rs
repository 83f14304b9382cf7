use eframe::egui::{self, TextEdit, Widget};
use mapedit::{CanvasPos, PointRef, RouteExport, Tool};

use crate::app::{DashboardApp, ImportRouteWindow};

const MINIMAP_SIZE: f32 = 200.0;

pub fn draw_gui(app: &mut DashboardApp, ctx: &eframe::egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::SidePanel::left("left_panel")
            .default_width(320.0)
            .show_inside(ui, |ui| {
                bridge_gui(ui, app);
                ui.separator();
                toolbar_gui(ui, app);
                ui.separator();
                robot_gui(ui, app);
                ui.separator();
                waypoint_list_gui(ui, app);
            });

        map_gui(ui, app);
    });

    {
        let mut open = app.show_minimap;
        egui::Window::new("Mini-map")
            .open(&mut open)
            .resizable(false)
            .default_pos(egui::pos2(ctx.screen_rect().right() - MINIMAP_SIZE - 40.0, 40.0))
            .show(ctx, |ui| {
                ui.checkbox(&mut app.follow_robot, "Follow robot");
                let pose = app.session.pose().copied();
                app.minimap_canvas.show(
                    ui,
                    egui::vec2(MINIMAP_SIZE, MINIMAP_SIZE),
                    &mut app.minimap,
                    &mut app.session.model,
                    pose.as_ref(),
                );
            });
        app.show_minimap = open;
    }

    {
        let mut open = app.import_route_window.is_some();
        let mut imported = None;
        if let Some(state) = app.import_route_window.as_mut() {
            egui::Window::new("Import route")
                .open(&mut open)
                .resizable(true)
                .default_width(600.0)
                .show(ctx, |ui| {
                    imported = import_route_window(ui, state);
                });
        }
        if let Some(route) = imported {
            app.import_route(&route);
            open = false;
        }
        if !open {
            app.import_route_window = None;
        }
    }
}

fn import_route_window(ui: &mut egui::Ui, state: &mut ImportRouteWindow) -> Option<RouteExport> {
    let mut value = None;
    ui.heading("Paste a saved route (JSON).");

    egui::SidePanel::right("import_result")
        .default_width(250.0)
        .show_inside(ui, |ui| match &state.parse_result {
            Ok(route) => {
                if ui.button("Import").clicked() {
                    value = Some(route.clone());
                }
                ui.label(format!(
                    "{} waypoints, {} keepout zones",
                    route.waypoints.len(),
                    route.keepout_zones.len()
                ));
            }
            Err(err) => {
                ui.add_enabled(false, egui::Button::new("Import"));
                ui.label(format!("Parse error: {}", err));
            }
        });

    let text = TextEdit::multiline(&mut state.input)
        .desired_rows(20)
        .desired_width(f32::INFINITY);
    if text.ui(ui).changed() {
        *state = ImportRouteWindow::from_string(std::mem::take(&mut state.input));
    }

    value
}

fn bridge_gui(ui: &mut egui::Ui, app: &mut DashboardApp) {
    ui.heading("Bridge");
    let state = if app.bridge.is_connected() {
        "connected"
    } else {
        "disconnected"
    };
    ui.label(format!("{} ({})", app.bridge.description(), state));
    match app.session.model.map() {
        Some(map) => ui.label(format!(
            "Map {}x{} @ {:.3} m/px",
            map.width, map.height, map.resolution
        )),
        None => ui.label("Waiting for map..."),
    };
}

fn toolbar_gui(ui: &mut egui::Ui, app: &mut DashboardApp) {
    ui.heading("Patrol editor");
    ui.horizontal(|ui| {
        for tool in Tool::ALL {
            let label = match tool {
                Tool::Select => "☝ Select",
                Tool::Waypoint => "📍 Waypoint",
                Tool::Keepout => "⛔ Keepout",
                Tool::Pan => "✋ Pan",
            };
            if ui.selectable_label(app.editor.tool() == tool, label).clicked() {
                app.set_tool(tool);
            }
        }
    });
    if app.editor.tool() == Tool::Keepout {
        ui.label("Click to add vertices, double-click to close, Esc to abandon.");
    }

    ui.horizontal(|ui| {
        if ui.button("Fit map").clicked() {
            let model = &app.session.model;
            app.editor.fit(model);
        }
        if ui.button("🗑 Clear all").clicked() {
            app.clear_all();
        }
    });
    ui.horizontal(|ui| {
        if ui.button("💾 Save route").clicked() {
            app.save_route();
        }
        if ui
            .add_enabled(
                app.import_route_window.is_none(),
                egui::Button::new("Import route..."),
            )
            .clicked()
        {
            app.import_route_window = Some(ImportRouteWindow::from_string(String::new()));
        }
    });
    if let Some(status) = app.status.as_ref() {
        ui.label(status);
    }

    let model = &app.session.model;
    let completed = model.zones().iter().filter(|z| z.completed).count();
    ui.label(format!(
        "{} waypoints, {} keepout zones",
        model.waypoints().len(),
        completed
    ));
    ui.label(format!("Zoom: {:.2}x", app.editor.view().state().scale()));
    if let Some(pos) = app.editor_canvas.hover {
        let world = app.editor.screen_to_world(model, pos);
        ui.label(format!("Cursor: x={:.2} y={:.2}", world.x, world.y));
    }
}

fn robot_gui(ui: &mut egui::Ui, app: &mut DashboardApp) {
    ui.heading("Robot");
    match app.session.pose() {
        Some(pose) => {
            ui.label(format!(
                "x={:.2} y={:.2} yaw={:.1}°",
                pose.position.x,
                pose.position.y,
                pose.yaw().to_degrees()
            ));
        }
        None => {
            ui.label("No pose received.");
        }
    }
}

fn waypoint_list_gui(ui: &mut egui::Ui, app: &mut DashboardApp) {
    ui.heading("Waypoints");
    let selection = app.editor.geometry_editor().selection();
    egui::ScrollArea::vertical().show(ui, |ui| {
        for (i, point) in app.session.model.waypoints().iter().enumerate() {
            let selected = selection == Some(PointRef::Waypoint(point.id));
            let text = format!("{}. x={:.2} y={:.2}", i + 1, point.x, point.y);
            if selected {
                ui.strong(text);
            } else {
                ui.label(text);
            }
        }
        if let Some(PointRef::ZoneVertex { zone, .. }) = selection {
            ui.label(format!("Selected vertex of keepout zone {}", zone));
        }
    });
}

fn map_gui(ui: &mut egui::Ui, app: &mut DashboardApp) {
    let size = ui.available_size();
    let pose = app.session.pose().copied();
    let response = app.editor_canvas.show(
        ui,
        size,
        &mut app.editor,
        &mut app.session.model,
        pose.as_ref(),
    );
    if let Some(pos) = app.editor_canvas.hover {
        response.on_hover_text_at_pointer(hover_text(app, pos));
    }
}

fn hover_text(app: &DashboardApp, pos: CanvasPos) -> String {
    let world = app.editor.screen_to_world(&app.session.model, pos);
    format!("{:.2}, {:.2}", world.x, world.y)
}
