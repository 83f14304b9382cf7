use std::time::Duration;

use mapedit::{
    messages::{OCCUPANCY_GRID_TYPE, POSE_WITH_COVARIANCE_TYPE},
    MessageKind, RouteError, RouteExport, Session, Tool, Viewport,
};
use tracing::{info, warn};

use crate::{
    bridge::{Bridge, BridgeError, Subscription},
    canvas::MapCanvas,
    config::DashboardConfig,
};

pub struct ImportRouteWindow {
    pub input: String,
    pub parse_result: Result<RouteExport, RouteError>,
}

impl ImportRouteWindow {
    pub fn from_string(input: String) -> Self {
        let parse_result = RouteExport::parse(&input);
        ImportRouteWindow {
            input,
            parse_result,
        }
    }
}

pub struct DashboardApp {
    pub config: DashboardConfig,
    pub session: Session,
    pub editor: Viewport,
    pub minimap: Viewport,
    pub editor_canvas: MapCanvas,
    pub minimap_canvas: MapCanvas,
    pub bridge: Box<dyn Bridge>,
    pub subscriptions: Vec<Subscription>,
    pub follow_robot: bool,
    pub show_minimap: bool,
    pub import_route_window: Option<ImportRouteWindow>,
    /// Outcome of the last save/import, shown in the side panel.
    pub status: Option<String>,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig, mut bridge: Box<dyn Bridge>) -> Result<Self, BridgeError> {
        let subscriptions = vec![
            bridge.subscribe(&config.bridge.map_topic, OCCUPANCY_GRID_TYPE)?,
            bridge.subscribe(&config.bridge.pose_topic, POSE_WITH_COVARIANCE_TYPE)?,
        ];
        Ok(DashboardApp {
            editor: Viewport::editor(&config.editor_view(), config.editor.clone()),
            minimap: Viewport::viewer(&config.minimap_view()),
            session: Session::new(),
            editor_canvas: MapCanvas::default(),
            minimap_canvas: MapCanvas::default(),
            bridge,
            subscriptions,
            follow_robot: true,
            show_minimap: true,
            import_route_window: None,
            status: None,
            config,
        })
    }

    pub fn process_bridge_msgs(&mut self) {
        while let Some(msg) = self.bridge.try_recv() {
            let applied = self.session.apply(&msg.topic, msg.kind, &msg.payload);
            if applied && msg.kind == MessageKind::OccupancyGrid {
                self.editor_canvas.needs_fit = true;
                self.minimap_canvas.needs_fit = true;
            }
        }
    }

    pub fn follow(&mut self) {
        if !self.follow_robot {
            return;
        }
        if let Some(pose) = self.session.pose() {
            self.minimap.follow(&self.session.model, pose.world_pos());
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.editor.set_tool(tool);
    }

    pub fn clear_all(&mut self) {
        self.session.model.clear_all();
        self.editor.reset_editor();
    }

    pub fn save_route(&mut self) {
        let route = RouteExport::from_model(&self.session.model);
        let path = &self.config.route_path;
        self.status = Some(match route.save(path) {
            Ok(()) => format!("Saved route to {}", path.display()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "route save failed");
                format!("Save failed: {}", err)
            }
        });
    }

    /// Restores the route last saved to `route_path`. A missing file is not
    /// an error; returns whether a route was loaded.
    pub fn load_saved_route(&mut self) -> Result<bool, RouteError> {
        let path = self.config.route_path.clone();
        if !path.exists() {
            return Ok(false);
        }
        let route = RouteExport::load(&path)?;
        self.import_route(&route);
        Ok(true)
    }

    pub fn import_route(&mut self, route: &RouteExport) {
        route.apply_to(&mut self.session.model);
        self.editor.reset_editor();
        info!(waypoints = route.waypoints.len(), "route imported");
        self.status = Some(format!("Imported {} waypoints", route.waypoints.len()));
    }
}

impl Drop for DashboardApp {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            self.bridge.unsubscribe(subscription);
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        self.process_bridge_msgs();
        self.follow();

        crate::gui::draw_gui(self, ctx);

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::offline::OfflineBridge;

    fn offline_app() -> DashboardApp {
        DashboardApp::new(DashboardConfig::default(), Box::new(OfflineBridge::new())).unwrap()
    }

    #[test]
    fn offline_map_arrives_on_first_poll() {
        let mut app = offline_app();
        assert!(app.session.model.map().is_none());
        app.process_bridge_msgs();
        assert!(app.session.model.map().is_some());
        assert!(app.editor_canvas.needs_fit);
    }

    #[test]
    fn import_window_reports_parse_errors() {
        let window = ImportRouteWindow::from_string("not json".to_string());
        assert!(window.parse_result.is_err());
        let window = ImportRouteWindow::from_string(r#"{"waypoints": []}"#.to_string());
        assert!(window.parse_result.is_ok());
    }

    #[test]
    fn saved_route_is_restored_on_next_start() {
        let path = std::env::temp_dir().join(format!(
            "patrol_dashboard_route_{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let config = DashboardConfig {
            route_path: path.clone(),
            ..DashboardConfig::default()
        };

        let mut first = DashboardApp::new(config.clone(), Box::new(OfflineBridge::new())).unwrap();
        assert!(!first.load_saved_route().unwrap());
        first.session.model.add_waypoint(mapedit::WorldPos::new(1.0, 2.0));
        first.save_route();
        drop(first);

        let mut second = DashboardApp::new(config, Box::new(OfflineBridge::new())).unwrap();
        assert!(second.load_saved_route().unwrap());
        assert_eq!(second.session.model.waypoints().len(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn import_replaces_entities() {
        let mut app = offline_app();
        app.process_bridge_msgs();
        app.session.model.add_waypoint(mapedit::WorldPos::new(1.0, 1.0));
        let route = RouteExport::parse(
            r#"{"waypoints": [{"order": 1, "x": 0.0, "y": 0.0}, {"order": 2, "x": 2.0, "y": 0.0}]}"#,
        )
        .unwrap();
        app.import_route(&route);
        assert_eq!(app.session.model.waypoints().len(), 2);
        assert!(app.session.model.map().is_some());
    }
}
