use crate::domain::{conversation::Platform, message::ContentKind};

/// Backend route for a media send. Endpoint selection branches on both the
/// platform and the media kind; each combination maps to a distinct route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaRoute {
    family: RouteFamily,
    kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteFamily {
    Whatsapp,
    Instagram,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl MediaRoute {
    /// Returns the route for a platform/kind combination, or `None` for
    /// kinds that cannot travel through the media endpoints.
    pub fn select(platform: Platform, kind: ContentKind) -> Option<Self> {
        let kind = match kind {
            ContentKind::Image | ContentKind::Gif => MediaKind::Image,
            ContentKind::Video => MediaKind::Video,
            ContentKind::Audio => MediaKind::Audio,
            ContentKind::File => MediaKind::File,
            ContentKind::Text | ContentKind::Carousel | ContentKind::Interactive => return None,
        };

        let family = match platform {
            Platform::Whatsapp => RouteFamily::Whatsapp,
            Platform::Instagram => RouteFamily::Instagram,
            Platform::Messenger | Platform::Telegram | Platform::Other => RouteFamily::Generic,
        };

        Some(Self { family, kind })
    }

    pub fn path(&self) -> &'static str {
        match (self.family, self.kind) {
            (RouteFamily::Whatsapp, MediaKind::Image) => "/whatsapp/send-image",
            (RouteFamily::Whatsapp, MediaKind::Video) => "/whatsapp/send-video",
            (RouteFamily::Whatsapp, MediaKind::Audio) => "/whatsapp/send-audio",
            (RouteFamily::Whatsapp, MediaKind::File) => "/whatsapp/send-file",
            (RouteFamily::Instagram, MediaKind::Image) => "/instagram/send-image",
            (RouteFamily::Instagram, MediaKind::Video) => "/instagram/send-video",
            (RouteFamily::Instagram, MediaKind::Audio) => "/instagram/send-audio",
            (RouteFamily::Instagram, MediaKind::File) => "/instagram/send-file",
            (RouteFamily::Generic, MediaKind::Image) => "/messages/send-image",
            (RouteFamily::Generic, MediaKind::Video) => "/messages/send-video",
            (RouteFamily::Generic, MediaKind::Audio) => "/messages/send-audio",
            (RouteFamily::Generic, MediaKind::File) => "/messages/send-file",
        }
    }
}
