use eframe::egui;
use tracing::info;

use tomolens_core::{Axis, Patch};
use tomolens_views::{ArtifactId, ScatterData, ViewController, ViewMode};

use crate::io::FolderSource;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Side length of the scatter plot panels, in points.
const SCATTER_SIDE: f32 = 330.0;
/// Display size of the patch / slice images, in points.
const IMAGE_SIDE: f32 = 300.0;
/// Click tolerance around a scatter point, in points.
const PICK_RADIUS: f32 = 8.0;
/// Margin inside the scatter plot, in points.
const PLOT_MARGIN: f32 = 14.0;

/// Qualitative per-class colors, assigned by legend order.
const CLASS_COLORS: [egui::Color32; 12] = [
    egui::Color32::from_rgb(253, 50, 22),
    egui::Color32::from_rgb(0, 254, 53),
    egui::Color32::from_rgb(106, 118, 252),
    egui::Color32::from_rgb(254, 190, 42),
    egui::Color32::from_rgb(251, 0, 209),
    egui::Color32::from_rgb(32, 217, 244),
    egui::Color32::from_rgb(246, 249, 38),
    egui::Color32::from_rgb(255, 154, 0),
    egui::Color32::from_rgb(114, 218, 0),
    egui::Color32::from_rgb(188, 117, 255),
    egui::Color32::from_rgb(0, 168, 255),
    egui::Color32::from_rgb(255, 105, 161),
];

fn class_color(slot: usize) -> egui::Color32 {
    CLASS_COLORS[slot % CLASS_COLORS.len()]
}

// ---------------------------------------------------------------------------
// Application struct
// ---------------------------------------------------------------------------

pub(crate) struct TomoLensApp {
    controller: ViewController<FolderSource>,
    stems: Vec<String>,

    // UI state
    selected_stem: String,
    instance_entry: String,
    frame_index: usize,

    // Textures keyed by the artifact revision they were built for.
    patch_texture: Option<(egui::TextureHandle, u64)>,
    slice_texture: Option<(egui::TextureHandle, u64, usize)>,

    // Per-panel error banners; one failing view leaves the others intact.
    file_error: Option<String>,
    primary_error: Option<String>,
    subcluster_error: Option<String>,
    patch_error: Option<String>,
    export_status: Option<String>,
}

impl TomoLensApp {
    pub(crate) fn new(source: FolderSource, stems: Vec<String>) -> Self {
        Self {
            controller: ViewController::new(source),
            stems,
            selected_stem: String::new(),
            instance_entry: String::new(),
            frame_index: 0,
            patch_texture: None,
            slice_texture: None,
            file_error: None,
            primary_error: None,
            subcluster_error: None,
            patch_error: None,
            export_status: None,
        }
    }

    /// The back-reference label of the current selection, for markers.
    fn selected_label(&self) -> Option<String> {
        let ctx = self.controller.context();
        let stem = ctx.file_stem.as_ref()?;
        let id = ctx.instance?;
        Some(format!("{stem}_{id}"))
    }

    // -- Event handlers --------------------------------------------------

    fn handle_file_pick(&mut self, stem: String) {
        match self.controller.file_selected(&stem) {
            Ok(()) => {
                self.file_error = None;
                self.primary_error = None;
                self.subcluster_error = None;
                self.patch_error = None;
                self.export_status = None;
                self.instance_entry.clear();
                self.frame_index = 0;
            }
            Err(e) => self.file_error = Some(e.to_string()),
        }
        self.selected_stem = stem;
    }

    fn handle_primary_click(&mut self, label: &str) {
        match self.controller.point_clicked(label) {
            Ok(source) => {
                info!(label, ?source, "Selected point");
                self.primary_error = None;
                self.patch_error = None;
                self.frame_index = 0;
            }
            Err(e) => self.primary_error = Some(e.to_string()),
        }
    }

    fn handle_subcluster_click(&mut self, label: &str) {
        match self.controller.subcluster_point_clicked(label) {
            Ok(()) => {
                self.subcluster_error = None;
                self.patch_error = None;
                self.frame_index = 0;
            }
            Err(e) => self.subcluster_error = Some(e.to_string()),
        }
    }

    fn handle_instance_entry(&mut self) {
        let Ok(id) = self.instance_entry.trim().parse::<u32>() else {
            self.patch_error = Some(format!("not an instance id: {:?}", self.instance_entry));
            return;
        };
        match self.controller.instance_entered(id) {
            Ok(()) => {
                self.patch_error = None;
                self.frame_index = 0;
            }
            Err(e) => self.patch_error = Some(e.to_string()),
        }
    }

    // -- Textures --------------------------------------------------------

    /// Rebuild the 3-D patch preview (a maximum-intensity projection of the
    /// masked patch) when the patch artifact was recomputed.
    fn refresh_patch_texture(&mut self, ctx: &egui::Context) {
        let revision = self.controller.revision(ArtifactId::Patch3D);
        if self
            .patch_texture
            .as_ref()
            .is_some_and(|(_, r)| *r == revision)
        {
            return;
        }
        let image = match self.controller.patch3d() {
            Ok(Some(set)) => {
                let (rows, cols, data) = mip_z(&set.masked);
                Some(gray_image(rows, cols, &data))
            }
            Ok(None) => None,
            Err(e) => {
                self.patch_error = Some(e.to_string());
                None
            }
        };
        self.patch_texture = image.map(|img| {
            (
                ctx.load_texture("patch_mip", img, egui::TextureOptions::NEAREST),
                revision,
            )
        });
    }

    /// Rebuild the slice frame texture when the slice artifact or the frame
    /// index changed.
    fn refresh_slice_texture(&mut self, ctx: &egui::Context) {
        let revision = self.controller.revision(ArtifactId::Slice2D);
        if self
            .slice_texture
            .as_ref()
            .is_some_and(|(_, r, f)| *r == revision && *f == self.frame_index)
        {
            return;
        }
        let image = match self.controller.slice2d() {
            Ok(Some(seq)) => {
                let last = seq.len().saturating_sub(1);
                let index = self.frame_index.min(last);
                self.frame_index = index;
                seq.frame(index)
                    .map(|f| gray_image(f.rows, f.cols, &f.data))
            }
            Ok(None) => None,
            Err(e) => {
                self.patch_error = Some(e.to_string());
                None
            }
        };
        self.slice_texture = image.map(|img| {
            (
                ctx.load_texture("tomo_slice", img, egui::TextureOptions::NEAREST),
                revision,
                self.frame_index,
            )
        });
    }

    // -- Panels ----------------------------------------------------------

    fn file_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("File:");
            let mut picked: Option<String> = None;
            egui::ComboBox::from_id_salt("file_dropdown")
                .width(320.0)
                .selected_text(if self.selected_stem.is_empty() {
                    "Select a file for visualization"
                } else {
                    self.selected_stem.as_str()
                })
                .show_ui(ui, |ui| {
                    for stem in &self.stems {
                        if ui
                            .selectable_label(*stem == self.selected_stem, stem)
                            .clicked()
                        {
                            picked = Some(stem.clone());
                        }
                    }
                });
            if let Some(stem) = picked {
                self.handle_file_pick(stem);
            }

            ui.separator();
            ui.label("Instance id:");
            let entry = ui.add(
                egui::TextEdit::singleline(&mut self.instance_entry).desired_width(80.0),
            );
            if entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.handle_instance_entry();
            }

            if let Some(id) = self.controller.context().instance {
                ui.label(format!("Instance id: {id}"));
            }
        });
        if let Some(err) = &self.file_error {
            ui.colored_label(egui::Color32::LIGHT_RED, err);
        }
    }

    fn scatter_panel(
        ui: &mut egui::Ui,
        scatter: &ScatterData,
        selected: Option<usize>,
    ) -> Option<String> {
        let (response, painter) =
            ui.allocate_painter(egui::vec2(SCATTER_SIDE, SCATTER_SIDE), egui::Sense::click());
        let rect = response.rect;
        painter.rect_filled(rect, 4.0, egui::Color32::from_gray(24));

        if scatter.is_empty() {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No points",
                egui::FontId::proportional(14.0),
                egui::Color32::GRAY,
            );
            return None;
        }

        let (min_x, max_x, min_y, max_y) = scatter.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
        let span_x = (max_x - min_x).max(f64::EPSILON);
        let span_y = (max_y - min_y).max(f64::EPSILON);
        let inner = rect.shrink(PLOT_MARGIN);
        let to_screen = |x: f64, y: f64| {
            egui::pos2(
                inner.min.x + ((x - min_x) / span_x) as f32 * inner.width(),
                // Data y grows upward, screen y downward.
                inner.max.y - ((y - min_y) / span_y) as f32 * inner.height(),
            )
        };

        for p in &scatter.points {
            let slot = scatter.class_slot(&p.class).unwrap_or(0);
            painter.circle_filled(to_screen(p.x, p.y), 3.0, class_color(slot));
        }
        if let Some(i) = selected {
            let p = &scatter.points[i];
            painter.circle_stroke(
                to_screen(p.x, p.y),
                7.0,
                egui::Stroke::new(2.0, egui::Color32::WHITE),
            );
        }

        // Legend strip under the points.
        let mut legend = String::new();
        for class in scatter.classes.iter().take(8) {
            if !legend.is_empty() {
                legend.push_str("  ");
            }
            legend.push_str(class);
        }
        painter.text(
            egui::pos2(rect.min.x + 6.0, rect.max.y - 6.0),
            egui::Align2::LEFT_BOTTOM,
            legend,
            egui::FontId::proportional(11.0),
            egui::Color32::GRAY,
        );

        // Click: pick the nearest point within tolerance.
        let mut clicked_label = None;
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let mut best: Option<(f32, &str)> = None;
                for p in &scatter.points {
                    let d = to_screen(p.x, p.y).distance(pos);
                    if d <= PICK_RADIUS && best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, &p.label));
                    }
                }
                clicked_label = best.map(|(_, label)| label.to_string());
            }
        }
        clicked_label
    }

    fn primary_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Embeddings UMAP");
        if let Some(err) = self.primary_error.clone() {
            ui.colored_label(egui::Color32::LIGHT_RED, err);
        }
        let scatter = match self.controller.primary_scatter() {
            Ok(s) => s.clone(),
            Err(e) => {
                self.primary_error = Some(e.to_string());
                ScatterData::default()
            }
        };
        let selected = self
            .selected_label()
            .and_then(|label| scatter.find_label(&label));
        if let Some(label) = Self::scatter_panel(ui, &scatter, selected) {
            self.handle_primary_click(&label);
        }
    }

    fn subcluster_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Subcluster UMAP");
        if let Some(err) = self.subcluster_error.clone() {
            ui.colored_label(egui::Color32::LIGHT_RED, err);
        }
        match self.controller.context().cluster.clone() {
            Some(cluster) => {
                ui.label(format!("Cluster: {cluster}"));
            }
            None => {
                ui.label("Select a point in the UMAP plot");
            }
        }
        let scatter = match self.controller.subcluster_scatter() {
            Ok(s) => s.clone(),
            Err(e) => {
                self.subcluster_error = Some(e.to_string());
                ScatterData::default()
            }
        };
        let selected = self
            .selected_label()
            .and_then(|label| scatter.find_label(&label));
        if let Some(label) = Self::scatter_panel(ui, &scatter, selected) {
            self.handle_subcluster_click(&label);
        }
    }

    fn patch_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Selected particle");
        if let Some(err) = &self.patch_error {
            ui.colored_label(egui::Color32::LIGHT_RED, err);
        }
        self.refresh_patch_texture(ctx);
        match &self.patch_texture {
            Some((texture, _)) => {
                ui.add(
                    egui::Image::new(texture)
                        .fit_to_exact_size(egui::vec2(IMAGE_SIDE, IMAGE_SIDE)),
                );
                ui.label("Maximum-intensity projection of the masked patch");
            }
            None => {
                ui.label("Select a point in the UMAP plot");
            }
        }
    }

    fn slice_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Selected particle view");

        ui.horizontal(|ui| {
            ui.label("Axis:");
            let mut axis = self.controller.context().slice_axis;
            egui::ComboBox::from_id_salt("sliding_axis")
                .selected_text(axis.label())
                .show_ui(ui, |ui| {
                    for a in Axis::ALL {
                        ui.selectable_value(&mut axis, a, a.label());
                    }
                });
            self.controller.axis_changed(axis);

            ui.label("View type:");
            let mut mode = self.controller.context().view_mode;
            egui::ComboBox::from_id_salt("view_type")
                .selected_text(mode.label())
                .show_ui(ui, |ui| {
                    for m in ViewMode::ALL {
                        ui.selectable_value(&mut mode, m, m.label());
                    }
                });
            self.controller.view_mode_changed(mode);
        });

        let frame_count = match self.controller.slice2d() {
            Ok(Some(seq)) => seq.len(),
            Ok(None) => 0,
            Err(e) => {
                self.patch_error = Some(e.to_string());
                0
            }
        };
        if frame_count > 0 {
            ui.add(
                egui::Slider::new(&mut self.frame_index, 0..=frame_count - 1).text("frame"),
            );
        }

        self.refresh_slice_texture(ctx);
        match &self.slice_texture {
            Some((texture, _, _)) => {
                ui.add(
                    egui::Image::new(texture)
                        .fit_to_exact_size(egui::vec2(IMAGE_SIDE, IMAGE_SIDE)),
                );
            }
            None => {
                ui.label("Select a point in the UMAP plot");
            }
        }

        if frame_count > 0 && ui.button("Export slice as PNG…").clicked() {
            self.export_current_slice();
        }
        if let Some(status) = &self.export_status {
            ui.label(status.clone());
        }
    }

    fn export_current_slice(&mut self) {
        let ctx = self.controller.context().clone();
        let Some(stem) = ctx.file_stem.clone() else {
            return;
        };
        let Some(id) = ctx.instance else {
            return;
        };
        let frame = match self.controller.slice2d() {
            Ok(Some(seq)) => seq.frame(self.frame_index),
            _ => None,
        };
        let Some(frame) = frame else {
            return;
        };

        let suggested = format!(
            "{stem}_instance_{id}_{}{}.png",
            ctx.slice_axis.label(),
            self.frame_index
        );
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&suggested)
            .add_filter("PNG image", &["png"])
            .save_file()
        else {
            return;
        };

        let metadata = tomolens_views::export::ExportMetadata {
            tomogram: stem,
            instance_id: id,
            axis: ctx.slice_axis,
            frame_index: self.frame_index,
            canonical_shape: tomolens_core::CANONICAL_SHAPE,
            view_mode: ctx.view_mode.label().to_string(),
        };
        self.export_status =
            Some(match tomolens_views::export::export_slice_png(&frame, &path, &metadata) {
                Ok(()) => format!("Exported {}", path.display()),
                Err(e) => e,
            });
    }
}

// ---------------------------------------------------------------------------
// Image helpers
// ---------------------------------------------------------------------------

/// Maximum-intensity projection along Z, as (rows, cols, data).
fn mip_z(patch: &Patch) -> (usize, usize, Vec<f32>) {
    let [nz, ny, nx] = patch.shape;
    let mut out = vec![f32::NEG_INFINITY; ny * nx];
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let v = patch.get(z, y, x);
                let cell = &mut out[y * nx + x];
                if v > *cell {
                    *cell = v;
                }
            }
        }
    }
    (ny, nx, out)
}

/// Min/max-normalized grayscale image from row-major intensities.
fn gray_image(rows: usize, cols: usize, data: &[f32]) -> egui::ColorImage {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in data {
        min = min.min(v);
        max = max.max(v);
    }
    let span = if max > min { max - min } else { 1.0 };
    let mut rgba = Vec::with_capacity(rows * cols * 4);
    for &v in data {
        let g = (((v - min) / span) * 255.0).round() as u8;
        rgba.extend_from_slice(&[g, g, g, 255]);
    }
    egui::ColorImage::from_rgba_unmultiplied([cols, rows], &rgba)
}

// ---------------------------------------------------------------------------
// eframe::App
// ---------------------------------------------------------------------------

impl eframe::App for TomoLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("file_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading("TomoLens embeddings visualization");
            ui.add_space(4.0);
            self.file_row(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                ui.horizontal_top(|ui| {
                    ui.vertical(|ui| self.primary_panel(ui));
                    ui.separator();
                    ui.vertical(|ui| self.patch_panel(ui, ctx));
                });
                ui.separator();
                ui.horizontal_top(|ui| {
                    ui.vertical(|ui| self.subcluster_panel(ui));
                    ui.separator();
                    ui.vertical(|ui| self.slice_panel(ui, ctx));
                });
            });
        });
    }
}
