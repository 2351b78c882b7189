//! The fixed set of marker templates, loaded once at startup

use std::path::Path;

use crate::capture::ColorModel;
use crate::error::PerceptionResult;
use crate::template_matching::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    MinimapCorner,
    Player,
    Rune,
    RuneBuff,
    Elite,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::MinimapCorner,
        TemplateKind::Player,
        TemplateKind::Rune,
        TemplateKind::RuneBuff,
        TemplateKind::Elite,
    ];

    /// Asset file name inside the templates directory
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::MinimapCorner => "minimap_template.jpg",
            TemplateKind::Player => "player_template.png",
            TemplateKind::Rune => "rune_template.png",
            TemplateKind::RuneBuff => "rune_buff_template.jpg",
            TemplateKind::Elite => "elite_template.jpg",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::MinimapCorner => "minimap_corner",
            TemplateKind::Player => "player",
            TemplateKind::Rune => "rune",
            TemplateKind::RuneBuff => "rune_buff",
            TemplateKind::Elite => "elite",
        }
    }
}

/// Read-only marker templates shared by the whole process
#[derive(Debug, Clone)]
pub struct TemplateSet {
    /// Bottom-right corner of the minimap frame
    pub minimap_corner: Template,
    pub player: Template,
    pub rune: Template,
    /// Buff icon granted by activating a rune
    pub rune_buff: Template,
    /// Elite boss warning sign
    pub elite: Template,
}

impl TemplateSet {
    /// Load every template from `directory`. Any missing or unreadable file is an error.
    pub fn load_from_dir(directory: impl AsRef<Path>, model: ColorModel) -> PerceptionResult<Self> {
        let directory = directory.as_ref();
        let load = |kind: TemplateKind| -> PerceptionResult<Template> {
            let mut template = Template::load(directory.join(kind.file_name()), model)?;
            template.name = kind.label().to_string();
            log::debug!(
                "🖼️ Loaded template '{}' ({}x{})",
                template.name,
                template.width(),
                template.height()
            );
            Ok(template)
        };

        let set = Self {
            minimap_corner: load(TemplateKind::MinimapCorner)?,
            player: load(TemplateKind::Player)?,
            rune: load(TemplateKind::Rune)?,
            rune_buff: load(TemplateKind::RuneBuff)?,
            elite: load(TemplateKind::Elite)?,
        };
        log::info!(
            "✅ Loaded {} templates from {}",
            TemplateKind::ALL.len(),
            directory.display()
        );
        Ok(set)
    }

    pub fn get(&self, kind: TemplateKind) -> &Template {
        match kind {
            TemplateKind::MinimapCorner => &self.minimap_corner,
            TemplateKind::Player => &self.player,
            TemplateKind::Rune => &self.rune,
            TemplateKind::RuneBuff => &self.rune_buff,
            TemplateKind::Elite => &self.elite,
        }
    }

    /// Color model frames must be converted to; taken from the player template
    pub fn color_model(&self) -> ColorModel {
        self.player.color_model()
    }
}
