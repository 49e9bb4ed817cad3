use std::error::Error;

use annotation::{Repository, SharedLandmark, TriangulationOutcome, triangulate_position};
use clap::Subcommand;
use foundation::Rgb;
use foundation::math::{LonLat, Vec2};
use session::{LONGITUDE_MAX, LONGITUDE_MIN, PersistedStore, Session, SessionStorage};
use tracing::{info, warn};

pub type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch the reference image catalogue of the study
    Images,

    /// List the orientation shortcuts of the study
    Shortcuts,

    /// Select the catalogue image closest to an orientation (defaults to the camera)
    Nearest {
        /// Degrees
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
        /// Degrees
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
    },

    /// Move the virtual camera and show the nearest image
    Rotate {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        latitude: f64,
    },

    /// Open a reference image for annotation
    OpenImage { name: String },

    /// Close an opened image by name
    CloseImage { name: String },

    /// Create a landmark and print its id
    AddLandmark {
        label: String,
        /// `#RRGGBB`, `#RGB` or `rgb(r, g, b)`; random when omitted
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove a landmark with its distances and selection
    RemoveLandmark { id: String },

    /// Mark a landmark in an image
    AddPose {
        id: String,
        image: String,
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
    },

    RemovePose { id: String, image: String },

    /// Add a landmark to the selected group
    Select { id: String },

    /// Measure between two landmarks (the selected pair by default)
    Distance {
        #[arg(long, requires = "right")]
        left: Option<String>,
        #[arg(long, requires = "left")]
        right: Option<String>,
    },

    RemoveDistance { label: String },

    /// Triangulate one landmark, or all of them
    Triangulate { id: Option<String> },

    /// Refresh cached reprojections of every positioned landmark in an opened image
    Reproject { image: String },

    /// Print the session state
    Report {
        /// Dump the persisted landmark snapshot instead
        #[arg(long)]
        json: bool,
    },

    /// Clear the whole session
    Reset,
}

pub async fn run<S: SessionStorage>(
    command: Command,
    session: &mut Session<S>,
    repository: &dyn Repository,
    study: &str,
) -> CliResult<()> {
    match command {
        Command::Images => {
            let images = repository.get_images(study).await?;
            info!(study, count = images.len(), "catalogue loaded");
            for image in &images {
                println!("{}\t{:.2}\t{:.2}", image.name, image.longitude, image.latitude);
            }
            session.update_vc_images(|s| {
                s.set_object_path(study);
                s.set_images(images);
            })?;
        }
        Command::Shortcuts => {
            for shortcut in repository.get_shortcuts(study).await? {
                println!("{}\t{:.2}\t{:.2}", shortcut.name, shortcut.longitude, shortcut.latitude);
            }
        }
        Command::Nearest {
            longitude,
            latitude,
        } => {
            let camera = session.camera();
            let orientation = LonLat::from_degrees(
                longitude.unwrap_or(camera.longitude()),
                latitude.unwrap_or(camera.latitude()),
            );
            show_nearest(session, orientation)?;
        }
        Command::Rotate {
            longitude,
            latitude,
        } => {
            let (lat_min, lat_max) = session.vc_images().latitude_bounds();
            let orientation = session.update_camera(|c| {
                c.set_longitude(longitude, LONGITUDE_MIN, LONGITUDE_MAX);
                c.set_latitude(latitude, lat_min, lat_max);
                c.to_rad()
            })?;
            println!("camera\t{:.2}\t{:.2}", orientation.lon_deg(), orientation.lat_deg());
            show_nearest(session, orientation)?;
        }
        Command::OpenImage { name } => {
            let image = repository.get_image(study, &name).await?;
            session.update_landmark_images(|s| {
                if !s.add_image(image) {
                    info!(image = %name, "image already open");
                }
                s.set_tab(&name);
            })?;
            println!("tab\t{}", session.landmark_images().tab_name());
        }
        Command::CloseImage { name } => {
            let closed = session.update_landmark_images(|s| {
                let index = s.images().iter().position(|i| i.name() == name)?;
                s.remove_image(index)
            })?;
            if closed.is_none() {
                return Err(format!("image not open: {name}").into());
            }
        }
        Command::AddLandmark { label, color } => {
            let color = color.as_deref().map(Rgb::parse).transpose()?;
            let id = session.update_landmarks(|s| {
                let landmark = s.collection_mut().add_landmark(label, color);
                let id = landmark.read().id().to_string();
                id
            })?;
            println!("{id}");
        }
        Command::RemoveLandmark { id } => {
            let removed = session.update_landmarks(|s| s.collection_mut().remove_landmark(&id))?;
            if removed.is_none() {
                return Err(unknown_landmark(&id));
            }
            session.update_landmark_images(|s| s.forget_landmark(&id))?;
        }
        Command::AddPose { id, image, x, y } => {
            let pose = Vec2::new(x, y);
            if !pose.is_finite() {
                return Err(format!("invalid pose: {x}, {y}").into());
            }
            let landmark = find_landmark(session, &id)?;
            session.update_landmarks(|_| landmark.write().add_pose(image, pose))?;
        }
        Command::RemovePose { id, image } => {
            let landmark = find_landmark(session, &id)?;
            let removed = session.update_landmarks(|_| landmark.write().remove_pose(&image))?;
            if removed.is_none() {
                warn!(landmark = %id, image = %image, "no pose to remove");
            }
        }
        Command::Select { id } => {
            if !session.update_landmarks(|s| s.collection_mut().select(&id))? {
                return Err(unknown_landmark(&id));
            }
            println!("selected\t{}", session.landmarks().collection().selected_group().ids().join(","));
        }
        Command::Distance { left, right } => {
            let added = session.update_landmarks(|s| {
                let c = s.collection_mut();
                match (&left, &right) {
                    (Some(left), Some(right)) => c.add_distance_by_id(left, right),
                    _ => c.add_selected_distance(),
                }
            })?;
            if !added {
                return Err("no new distance: need two distinct landmarks not already measured".into());
            }
            if let Some(d) = session.landmarks().collection().distances().last() {
                println!("{}", d.label());
            }
        }
        Command::RemoveDistance { label } => {
            if session
                .update_landmarks(|s| s.collection_mut().remove_distance(&label))?
                .is_none()
            {
                return Err(format!("unknown distance: {label}").into());
            }
        }
        Command::Triangulate { id } => {
            let targets: Vec<SharedLandmark> = match id {
                Some(id) => vec![find_landmark(session, &id)?],
                None => session.landmarks().collection().landmarks().to_vec(),
            };
            let mut failures = 0;
            for landmark in &targets {
                let label = landmark.read().label().to_string();
                match triangulate_position(landmark, repository, study).await {
                    Ok(TriangulationOutcome::Applied { position, version }) => {
                        println!(
                            "{label}\t{:.4}\t{:.4}\t{:.4}\tv{version}",
                            position.x, position.y, position.z
                        );
                    }
                    Ok(outcome) => println!("{label}\t{outcome:?}"),
                    Err(err) => {
                        println!("{label}\tfailed: {err}");
                        failures += 1;
                    }
                }
            }
            session.persist_landmarks()?;
            if failures > 0 {
                return Err(format!("{failures} triangulation(s) failed").into());
            }
        }
        Command::Reproject { image } => {
            let Some(mut opened) = session.landmark_images().image(&image).cloned() else {
                return Err(format!("image not open: {image}").into());
            };
            let landmarks = session.landmarks().collection().landmarks().to_vec();
            for landmark in &landmarks {
                let label = landmark.read().label().to_string();
                match opened.refresh_reprojection(repository, study, landmark).await {
                    Ok(Some(pose)) => println!("{label}\t{:.2}\t{:.2}", pose.x, pose.y),
                    Ok(None) => {}
                    Err(err) => warn!(landmark = %label, error = %err, "reprojection failed"),
                }
            }
            session.update_landmark_images(|s| {
                if let Some(slot) = s.image_mut(&image) {
                    *slot = opened;
                }
            })?;
        }
        Command::Report { json } => {
            if json {
                let value = session.landmarks().to_value()?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_report(session);
            }
        }
        Command::Reset => {
            session.reset()?;
            info!("session cleared");
        }
    }
    Ok(())
}

fn show_nearest<S: SessionStorage>(session: &mut Session<S>, orientation: LonLat) -> CliResult<()> {
    let picked = session.update_vc_images(|s| s.set_nearest_image(orientation).map(|i| i.name.clone()))?;
    match picked {
        Some(name) => println!("nearest\t{name}"),
        None => warn!("catalogue is empty, run `images` first"),
    }
    Ok(())
}

fn find_landmark<S: SessionStorage>(session: &Session<S>, id: &str) -> CliResult<SharedLandmark> {
    session
        .landmarks()
        .collection()
        .get(id)
        .cloned()
        .ok_or_else(|| unknown_landmark(id))
}

fn unknown_landmark(id: &str) -> Box<dyn Error> {
    format!("unknown landmark: {id}").into()
}

fn print_report<S: SessionStorage>(session: &Session<S>) {
    let collection = session.landmarks().collection();
    println!("study\t{}", session.vc_images().object_path());
    for landmark in collection.landmarks() {
        let l = landmark.read();
        let position = l
            .position()
            .map(|p| format!("{:.4},{:.4},{:.4}", p.x, p.y, p.z))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "landmark\t{}\t{}\t{}\tv{}\tposes={}\t{position}",
            l.id(),
            l.label(),
            l.color_hex(),
            l.version(),
            l.poses().len()
        );
    }
    for distance in collection.distances() {
        let length = distance
            .length()
            .map(|d| format!("{d:.4}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "distance\t{}\t{}\t{}\t{length}",
            distance.label(),
            distance.left_id(),
            distance.right_id()
        );
    }
    println!("selected\t{}", collection.selected_group().ids().join(","));
    println!("tab\t{}", session.landmark_images().tab_name());
}
