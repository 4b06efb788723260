use crate::models::{Subject, User};

pub fn render_dashboard(user: &User) -> String {
    page(
        "Dashboard",
        &DASHBOARD_BODY.replace("{{EMAIL}}", &escape_html(&user.email)),
        DASHBOARD_SCRIPT,
    )
}

pub fn render_subject(subject: &Subject) -> String {
    page(
        &subject.name,
        &SUBJECT_BODY.replace("{{SUBJECT_NAME}}", &escape_html(&subject.name)),
        &SUBJECT_SCRIPT.replace("{{SUBJECT_ID}}", &subject.id.to_string()),
    )
}

pub fn render_statistics(user: &User) -> String {
    page(
        "Account",
        &STATISTICS_BODY.replace("{{EMAIL}}", &escape_html(&user.email)),
        STATISTICS_SCRIPT,
    )
}

pub fn render_login(message: Option<&str>) -> String {
    let notice = message
        .map(|message| format!(r#"<p class="status" data-type="info">{}</p>"#, escape_html(message)))
        .unwrap_or_default();
    page("Sign in", &LOGIN_BODY.replace("{{NOTICE}}", &notice), "")
}

fn page(title: &str, body: &str, script: &str) -> String {
    PAGE_HTML
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{STYLE}}", STYLE)
        .replace("{{BODY}}", body)
        .replace("{{SCRIPT}}", script)
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} - Study Tracker</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <main class="app">
{{BODY}}
    <div class="status" id="status"></div>
  </main>
  <script>
    const statusEl = document.getElementById('status');

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const formatDuration = (seconds = 0) => {
      const h = String(Math.floor(seconds / 3600)).padStart(2, '0');
      const m = String(Math.floor((seconds % 3600) / 60)).padStart(2, '0');
      const s = String(seconds % 60).padStart(2, '0');
      return `${h}:${m}:${s}`;
    };

    const formatDate = (value) => {
      if (!value) {
        return 'Not started';
      }
      return new Date(value).toLocaleDateString('en-US', {
        year: 'numeric',
        month: 'long',
        day: 'numeric',
        hour: '2-digit',
        minute: '2-digit'
      });
    };

    const send = async (method, url, body) => {
      const res = await fetch(url, {
        method,
        headers: body ? { 'content-type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined
      });
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      return res.json();
    };

    // poll failures stay silent; the next poll retries
    const poll = (load) => {
      const run = () => load().catch(() => {});
      run();
      return setInterval(run, 1000);
    };

    const showWarning = (warning, lastSynced) => {
      if (warning) {
        const since = lastSynced ? ` (last synced ${new Date(lastSynced).toLocaleTimeString()})` : '';
        setStatus(`${warning}${since}`, 'error');
      } else if (statusEl.dataset.type === 'error' && statusEl.dataset.sticky !== 'true') {
        setStatus('', '');
      }
    };

    const reportError = (err) => {
      statusEl.dataset.sticky = 'true';
      setStatus(err.message, 'error');
      setTimeout(() => {
        statusEl.dataset.sticky = '';
      }, 4000);
    };
{{SCRIPT}}
  </script>
</body>
</html>
"#;

const STYLE: &str = r#"
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      margin: 0;
      font-size: 1.3rem;
    }

    nav a {
      color: var(--accent-2);
      margin-left: 14px;
      font-weight: 600;
    }

    .subtitle {
      margin: 0;
      color: #5f5c57;
      font-size: 1rem;
    }

    .layout {
      display: grid;
      grid-template-columns: 2fr 1fr;
      gap: 24px;
    }

    .list {
      display: grid;
      gap: 12px;
    }

    .card {
      background: white;
      border-radius: 18px;
      padding: 16px 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
    }

    .card .meta {
      font-size: 0.9rem;
      color: #8b857d;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
      text-align: center;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    form.inline {
      display: flex;
      gap: 8px;
    }

    form.stack {
      display: grid;
      gap: 10px;
    }

    input {
      border: 1px solid rgba(47, 72, 88, 0.2);
      border-radius: 12px;
      padding: 10px 12px;
      font: inherit;
      flex: 1;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font-size: 0.95rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent-2);
      color: white;
    }

    button.start {
      background: #2d7a4b;
    }

    button.stop {
      background: var(--accent);
    }

    button.ghost {
      background: transparent;
      color: #8b857d;
    }

    .legend {
      display: grid;
      gap: 6px;
      font-size: 0.9rem;
    }

    .legend span.dot {
      display: inline-block;
      width: 10px;
      height: 10px;
      border-radius: 50%;
      margin-right: 8px;
    }

    .donut {
      position: relative;
      width: 200px;
      height: 200px;
      margin: 12px auto;
    }

    .donut svg {
      width: 100%;
      height: 100%;
      transform: rotate(-90deg);
    }

    .donut .center {
      position: absolute;
      inset: 0;
      display: grid;
      place-items: center;
      text-align: center;
    }

    .tabs {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: rgba(47, 72, 88, 0.08);
      border-radius: 999px;
    }

    .tab {
      background: transparent;
      border-radius: 999px;
      padding: 8px 14px;
      color: #6b645d;
    }

    .tab.active {
      background: white;
      color: var(--accent-2);
      box-shadow: 0 8px 16px rgba(47, 72, 88, 0.12);
    }

    .chart-card {
      background: white;
      border-radius: 20px;
      padding: 16px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    #chart {
      width: 100%;
      height: 260px;
      display: block;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: white;
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: #7a746d;
      font-size: 11px;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
      min-height: 1.2em;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    @media (max-width: 720px) {
      .app {
        padding: 28px 22px;
      }
      .layout {
        grid-template-columns: 1fr;
      }
    }
"#;

const DASHBOARD_BODY: &str = r#"
    <header>
      <div>
        <h1>Your Subjects</h1>
        <p class="subtitle">Signed in as {{EMAIL}}</p>
      </div>
      <nav><a href="/statistics">Statistics</a></nav>
    </header>

    <section class="layout">
      <div class="list">
        <form id="add-form" class="inline">
          <input id="subject-name" placeholder="New subject name" autocomplete="off" />
          <input id="subject-description" placeholder="Description (optional)" autocomplete="off" />
          <button type="submit">Add</button>
        </form>
        <div id="subjects" class="list"></div>
      </div>

      <div class="stat">
        <h2>Time Overview</h2>
        <div class="donut">
          <svg id="donut" viewBox="0 0 200 200"></svg>
          <div class="center">
            <div>
              <div class="label">Total</div>
              <div class="value" id="grand-total">00:00:00</div>
            </div>
          </div>
        </div>
        <div class="legend" id="legend"></div>
      </div>
    </section>
"#;

const DASHBOARD_SCRIPT: &str = r#"
    const COLORS = ['#00C4FF', '#1E1B4B', '#FFA500', '#00FF88', '#FF3366'];
    const subjectsEl = document.getElementById('subjects');
    const donutEl = document.getElementById('donut');
    const legendEl = document.getElementById('legend');
    const grandTotalEl = document.getElementById('grand-total');

    const colorFor = (data, id) => {
      const index = data.subjects.findIndex((subject) => subject.id === id);
      return COLORS[Math.max(index, 0) % COLORS.length];
    };

    const renderDonut = (data) => {
      const radius = 80;
      const center = 100;
      const point = (deg) => [
        center + radius * Math.cos((Math.PI * deg) / 180),
        center + radius * Math.sin((Math.PI * deg) / 180)
      ];
      donutEl.innerHTML = data.arcs
        .filter((arc) => arc.sweep_deg > 0)
        .map((arc) => {
          const color = colorFor(data, arc.subject_id);
          if (arc.sweep_deg >= 359.999) {
            return `<circle cx="${center}" cy="${center}" r="${radius}" fill="none" stroke="${color}" stroke-width="20" />`;
          }
          const [sx, sy] = point(arc.start_deg);
          const [ex, ey] = point(arc.start_deg + arc.sweep_deg);
          const largeArc = arc.sweep_deg > 180 ? 1 : 0;
          return `<path d="M ${sx} ${sy} A ${radius} ${radius} 0 ${largeArc} 1 ${ex} ${ey}" fill="none" stroke="${color}" stroke-width="20" />`;
        })
        .join('');
    };

    const renderSubjects = (data) => {
      subjectsEl.replaceChildren(
        ...data.subjects.map((subject) => {
          const card = document.createElement('div');
          card.className = 'card';

          const info = document.createElement('div');
          const name = document.createElement('h3');
          name.textContent = subject.name;
          const total = document.createElement('div');
          total.className = 'meta';
          total.textContent = `${formatDuration(subject.total_seconds)} total`;
          const link = document.createElement('a');
          link.href = `/subjects/${subject.id}`;
          link.className = 'meta';
          link.textContent = `${subject.session_count} session${subject.session_count !== 1 ? 's' : ''}`;
          info.append(name, total, link);

          const actions = document.createElement('div');
          const toggle = document.createElement('button');
          const running = subject.running_session_id !== null;
          toggle.className = running ? 'stop' : 'start';
          toggle.textContent = running ? 'Stop' : 'Start';
          toggle.addEventListener('click', () => {
            send('POST', `/api/subjects/${subject.id}/toggle`).then(render).catch(reportError);
          });
          const remove = document.createElement('button');
          remove.className = 'ghost';
          remove.textContent = 'Delete';
          remove.addEventListener('click', () => {
            send('DELETE', `/api/subjects/${subject.id}`).then(render).catch(reportError);
          });
          actions.append(toggle, remove);

          card.append(info, actions);
          return card;
        })
      );
    };

    const renderLegend = (data) => {
      legendEl.replaceChildren(
        ...data.subjects.map((subject) => {
          const row = document.createElement('div');
          const dot = document.createElement('span');
          dot.className = 'dot';
          dot.style.backgroundColor = colorFor(data, subject.id);
          const label = document.createElement('span');
          label.textContent = `${subject.name} ${formatDuration(subject.total_seconds)}`;
          row.append(dot, label);
          return row;
        })
      );
    };

    const render = (data) => {
      renderSubjects(data);
      renderDonut(data);
      renderLegend(data);
      grandTotalEl.textContent = formatDuration(data.total_seconds);
      showWarning(data.sync_warning, data.last_synced);
    };

    document.getElementById('add-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const nameEl = document.getElementById('subject-name');
      const descriptionEl = document.getElementById('subject-description');
      if (!nameEl.value.trim()) {
        return;
      }
      send('POST', '/api/subjects', { name: nameEl.value, description: descriptionEl.value })
        .then(() => {
          nameEl.value = '';
          descriptionEl.value = '';
          return load();
        })
        .catch(reportError);
    });

    const load = async () => {
      const res = await fetch('/api/dashboard');
      if (res.ok) {
        render(await res.json());
      }
    };

    poll(load);
"#;

const SUBJECT_BODY: &str = r#"
    <header>
      <div>
        <h1>{{SUBJECT_NAME}}</h1>
        <p class="subtitle">Sessions for this subject</p>
      </div>
      <nav><a href="/">Back</a><a href="/statistics">Statistics</a></nav>
    </header>

    <section class="layout">
      <div id="sessions" class="list"></div>

      <div class="stat">
        <h2>Session Overview</h2>
        <span class="label">Total Sessions</span>
        <span class="value" id="session-count">0</span>
        <span class="label">Total Time</span>
        <span class="value" id="total-time">00:00:00</span>
        <button id="toggle" class="start" type="button">Start New Session</button>
      </div>
    </section>
"#;

const SUBJECT_SCRIPT: &str = r#"
    const subjectId = {{SUBJECT_ID}};
    const sessionsEl = document.getElementById('sessions');
    const countEl = document.getElementById('session-count');
    const totalEl = document.getElementById('total-time');
    const toggleEl = document.getElementById('toggle');

    const render = (data) => {
      if (!data.sessions.length) {
        const empty = document.createElement('div');
        empty.className = 'card';
        empty.textContent = 'No sessions recorded yet.';
        sessionsEl.replaceChildren(empty);
      } else {
        sessionsEl.replaceChildren(
          ...data.sessions.map((session) => {
            const card = document.createElement('div');
            card.className = 'card';
            const info = document.createElement('div');
            const time = document.createElement('h3');
            time.textContent = formatDuration(session.displayed_seconds);
            const started = document.createElement('div');
            started.className = 'meta';
            started.textContent = `Started: ${formatDate(session.start_time)}`;
            info.append(time, started);
            if (session.end_time) {
              const ended = document.createElement('div');
              ended.className = 'meta';
              ended.textContent = `Ended: ${formatDate(session.end_time)}`;
              info.append(ended);
            }
            card.append(info);
            if (session.running) {
              const stop = document.createElement('button');
              stop.className = 'stop';
              stop.textContent = 'Stop';
              stop.addEventListener('click', () => {
                send('POST', `/api/sessions/${session.id}/stop`).then(load).catch(reportError);
              });
              card.append(stop);
            }
            return card;
          })
        );
      }
      countEl.textContent = data.sessions.length;
      totalEl.textContent = formatDuration(data.total_seconds);
      const running = data.running_session_id !== null;
      toggleEl.className = running ? 'stop' : 'start';
      toggleEl.textContent = running ? 'Stop Session' : 'Start New Session';
      showWarning(data.sync_warning, data.last_synced);
    };

    toggleEl.addEventListener('click', () => {
      send('POST', `/api/subjects/${subjectId}/toggle`).then(load).catch(reportError);
    });

    const load = async () => {
      const res = await fetch(`/api/subjects/${subjectId}`);
      if (res.status === 404) {
        window.location.href = '/';
        return;
      }
      if (res.ok) {
        render(await res.json());
      }
    };

    poll(load);
"#;

const STATISTICS_BODY: &str = r#"
    <header>
      <div>
        <h1>Study Statistics</h1>
        <p class="subtitle">Email: {{EMAIL}}</p>
      </div>
      <nav><a href="/">Dashboard</a></nav>
    </header>

    <section class="stat">
      <span class="label">Total</span>
      <span class="value" id="total">00:00:00</span>
    </section>

    <section>
      <div class="tabs" role="tablist">
        <button class="tab active" type="button" data-tab="daily" role="tab" aria-selected="true">Daily</button>
        <button class="tab" type="button" data-tab="weekly" role="tab" aria-selected="false">Weekly</button>
        <button class="tab" type="button" data-tab="monthly" role="tab" aria-selected="false">Monthly</button>
      </div>
    </section>

    <section class="chart-card">
      <svg id="chart" viewBox="0 0 600 260" aria-label="Minutes studied" role="img"></svg>
    </section>

    <form method="post" action="/logout">
      <button type="submit" class="ghost">Logout</button>
    </form>
"#;

const STATISTICS_SCRIPT: &str = r#"
    const chartEl = document.getElementById('chart');
    const totalEl = document.getElementById('total');
    const tabs = Array.from(document.querySelectorAll('.tab'));

    let statsData = null;
    let activeTab = 'daily';

    const renderLineChart = (points) => {
      const width = 600;
      const height = 260;
      const paddingX = 44;
      const paddingY = 34;
      const top = 24;

      const max = Math.max(1, ...points.map((point) => point.value));
      const xStep = points.length > 1 ? (width - paddingX * 2) / (points.length - 1) : 0;
      const scaleY = (height - top - paddingY) / max;
      const x = (index) => paddingX + index * xStep;
      const y = (value) => height - paddingY - value * scaleY;

      const path = points
        .map((point, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(point.value).toFixed(2)}`)
        .join(' ');

      let grid = '';
      for (let i = 0; i <= 4; i += 1) {
        const value = (max * i) / 4;
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${y(value)}" x2="${width - paddingX}" y2="${y(value)}" />`;
        grid += `<text class="chart-label" x="${paddingX - 10}" y="${y(value) + 4}" text-anchor="end">${Math.round(value)}</text>`;
      }

      const labels = points
        .map((point, index) => `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${point.label}</text>`)
        .join('');
      const circles = points
        .map((point, index) => `<circle class="chart-point" cx="${x(index)}" cy="${y(point.value)}" r="4" />`)
        .join('');

      chartEl.innerHTML = `${grid}<path class="chart-line" d="${path}" />${circles}${labels}`;
    };

    const renderActiveTab = () => {
      if (!statsData) {
        return;
      }
      const buckets = statsData[activeTab] || [];
      renderLineChart(
        buckets.map((bucket) => ({
          label: bucket.label,
          value: Math.round(bucket.total_seconds / 60)
        }))
      );
    };

    tabs.forEach((button) => {
      button.addEventListener('click', () => {
        activeTab = button.dataset.tab;
        tabs.forEach((tab) => {
          const isActive = tab === button;
          tab.classList.toggle('active', isActive);
          tab.setAttribute('aria-selected', String(isActive));
        });
        renderActiveTab();
      });
    });

    const load = async () => {
      const res = await fetch('/api/statistics');
      if (!res.ok) {
        return;
      }
      statsData = await res.json();
      totalEl.textContent = formatDuration(statsData.total_seconds);
      showWarning(statsData.sync_warning, statsData.last_synced);
      renderActiveTab();
    };

    poll(load);
"#;

const LOGIN_BODY: &str = r#"
    <header>
      <div>
        <h1>Study Tracker</h1>
        <p class="subtitle">Track the time you spend on each subject.</p>
      </div>
    </header>
    {{NOTICE}}
    <section class="layout">
      <div class="stat">
        <h2>Login</h2>
        <form class="stack" method="post" action="/login">
          <input name="email" type="email" placeholder="Email" required />
          <input name="password" type="password" placeholder="Password" required />
          <button type="submit">Login</button>
        </form>
      </div>
      <div class="stat">
        <h2>Register</h2>
        <form class="stack" method="post" action="/register">
          <input name="first_name" placeholder="First name" />
          <input name="last_name" placeholder="Last name" />
          <input name="email" type="email" placeholder="Email" required />
          <input name="password" type="password" placeholder="Password" required />
          <button type="submit">Create account</button>
        </form>
      </div>
    </section>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_names_are_escaped() {
        let subject = Subject {
            id: 9,
            name: "<b>math</b>".to_string(),
            description: None,
            user_id: None,
            number_of_sessions: 0,
            time_allotted: 0,
        };
        let html = render_subject(&subject);
        assert!(html.contains("&lt;b&gt;math&lt;/b&gt;"));
        assert!(!html.contains("<b>math</b>"));
        assert!(html.contains("const subjectId = 9;"));
    }

    #[test]
    fn login_page_shows_notice() {
        let html = render_login(Some("Invalid email or password"));
        assert!(html.contains("Invalid email or password"));
        assert!(!html.contains("{{"));
    }
}
